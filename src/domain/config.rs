//! Per-type document descriptors.
//!
//! Every document type the service handles is described by one static
//! [`DocumentConfig`]; the generic service never branches on the type itself.

use super::document::fields;
use chrono::NaiveDate;
use std::fmt;

/// Builds a document ID from the type prefix, the human document number and
/// the creation day.
pub type IdGenerator = fn(prefix: &str, document_number: &str, day: NaiveDate) -> String;

/// Human-readable messages reported when an operation fails in the store.
#[derive(Debug, Clone, Copy)]
pub struct ErrorMessages {
    pub save: &'static str,
    pub get: &'static str,
    pub get_all: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
    pub search: &'static str,
}

/// A hosted logo URL and the inline logo payload it supersedes.
#[derive(Debug, Clone, Copy)]
pub struct LogoFields {
    pub url: &'static str,
    pub inline: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    DeliveryNote,
    WarrantyCard,
    Invoice,
    Quote,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::DeliveryNote,
        DocumentType::WarrantyCard,
        DocumentType::Invoice,
        DocumentType::Quote,
    ];

    pub fn config(&self) -> &'static DocumentConfig {
        match self {
            DocumentType::DeliveryNote => &DELIVERY_NOTE,
            DocumentType::WarrantyCard => &WARRANTY_CARD,
            DocumentType::Invoice => &INVOICE,
            DocumentType::Quote => &QUOTE,
        }
    }

    /// Resolve a collection name as used in verification links and API paths.
    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|doc_type| doc_type.config().collection == name)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentType::DeliveryNote => "Delivery Note",
            DocumentType::WarrantyCard => "Warranty Card",
            DocumentType::Invoice => "Invoice",
            DocumentType::Quote => "Quote",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug)]
pub struct DocumentConfig {
    pub doc_type: DocumentType,
    pub collection: &'static str,
    pub prefix: &'static str,
    pub document_number_field: &'static str,
    /// Payload fields holding dates; converted on every read and write.
    pub date_fields: &'static [&'static str],
    /// Date shown on the public verification page.
    pub document_date_field: &'static str,
    pub company_name_field: &'static str,
    pub customer_name_field: Option<&'static str>,
    pub total_amount_field: Option<&'static str>,
    pub logo: Option<LogoFields>,
    pub generate_id: IdGenerator,
    pub messages: ErrorMessages,
}

impl DocumentConfig {
    pub fn document_id(&self, document_number: &str, day: NaiveDate) -> String {
        (self.generate_id)(self.prefix, document_number, day)
    }
}

/// `YYMMDD_PREFIX-<number>`, with any `PREFIX-` already present in the number
/// removed so the prefix appears once.
pub fn dated_prefix_id(prefix: &str, document_number: &str, day: NaiveDate) -> String {
    let marker = format!("{}-", prefix);
    let number = document_number.trim().replace(&marker, "");
    format!("{}_{}{}", day.format("%y%m%d"), marker, number)
}

const LOGO: LogoFields = LogoFields {
    url: "logoUrl",
    inline: "logo",
};

pub static DELIVERY_NOTE: DocumentConfig = DocumentConfig {
    doc_type: DocumentType::DeliveryNote,
    collection: "deliveryNotes",
    prefix: "DN",
    document_number_field: "deliveryNoteNumber",
    date_fields: &["deliveryDate", "orderDate", fields::CANCELLED_AT],
    document_date_field: "deliveryDate",
    company_name_field: "companyName",
    customer_name_field: Some("customerName"),
    total_amount_field: None,
    logo: Some(LOGO),
    generate_id: dated_prefix_id,
    messages: ErrorMessages {
        save: "Failed to save delivery note",
        get: "Failed to load delivery note",
        get_all: "Failed to load delivery notes",
        update: "Failed to update delivery note",
        delete: "Failed to delete delivery note",
        search: "Failed to search delivery notes",
    },
};

pub static WARRANTY_CARD: DocumentConfig = DocumentConfig {
    doc_type: DocumentType::WarrantyCard,
    collection: "warrantyCards",
    prefix: "WC",
    document_number_field: "warrantyNumber",
    date_fields: &[
        "purchaseDate",
        "warrantyStartDate",
        "warrantyEndDate",
        fields::CANCELLED_AT,
    ],
    document_date_field: "purchaseDate",
    company_name_field: "companyName",
    customer_name_field: Some("customerName"),
    total_amount_field: None,
    logo: Some(LOGO),
    generate_id: dated_prefix_id,
    messages: ErrorMessages {
        save: "Failed to save warranty card",
        get: "Failed to load warranty card",
        get_all: "Failed to load warranty cards",
        update: "Failed to update warranty card",
        delete: "Failed to delete warranty card",
        search: "Failed to search warranty cards",
    },
};

pub static INVOICE: DocumentConfig = DocumentConfig {
    doc_type: DocumentType::Invoice,
    collection: "invoices",
    prefix: "INV",
    document_number_field: "invoiceNumber",
    date_fields: &["invoiceDate", "dueDate", "deliveryDate", fields::CANCELLED_AT],
    document_date_field: "invoiceDate",
    company_name_field: "companyName",
    customer_name_field: Some("customerName"),
    total_amount_field: Some("totalAmount"),
    logo: Some(LOGO),
    generate_id: dated_prefix_id,
    messages: ErrorMessages {
        save: "Failed to save invoice",
        get: "Failed to load invoice",
        get_all: "Failed to load invoices",
        update: "Failed to update invoice",
        delete: "Failed to delete invoice",
        search: "Failed to search invoices",
    },
};

pub static QUOTE: DocumentConfig = DocumentConfig {
    doc_type: DocumentType::Quote,
    collection: "quotes",
    prefix: "QT",
    document_number_field: "quoteNumber",
    date_fields: &["quoteDate", "validUntil", fields::CANCELLED_AT],
    document_date_field: "quoteDate",
    company_name_field: "companyName",
    customer_name_field: Some("customerName"),
    total_amount_field: Some("totalAmount"),
    logo: Some(LOGO),
    generate_id: dated_prefix_id,
    messages: ErrorMessages {
        save: "Failed to save quote",
        get: "Failed to load quote",
        get_all: "Failed to load quotes",
        update: "Failed to update quote",
        delete: "Failed to delete quote",
        search: "Failed to search quotes",
    },
};
