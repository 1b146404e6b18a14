pub mod cataloguing_pro;
pub mod integrations;
pub mod subjects;
