pub mod delivery_service;
pub mod hazard_service;
pub mod notification_service;
pub mod weather_service;
