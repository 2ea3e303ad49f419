pub mod lease_store;
