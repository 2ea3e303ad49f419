pub mod env_setting_center;
