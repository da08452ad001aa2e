mod manage_tests;
