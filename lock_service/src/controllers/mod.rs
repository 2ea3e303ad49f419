pub mod lock_controller;
