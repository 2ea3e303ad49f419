pub mod lock_demo_service;
