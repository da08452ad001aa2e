/// Generate an opaque verification token.
///
/// Tokens are random (UUID v4) and carry no information about the document
/// they are attached to, so they can be printed in public QR codes.
pub fn generate() -> String {
    uuid::Uuid::new_v4().to_string()
}
