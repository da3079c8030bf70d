pub mod account_service;
pub mod availability;
pub mod catalog;
pub mod payment;
pub mod reservation;
