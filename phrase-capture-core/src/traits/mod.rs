pub mod capture_provider;
