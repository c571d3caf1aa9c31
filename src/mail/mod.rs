pub mod decoders;
pub mod extractor;
pub mod imap_client;
pub mod session;
