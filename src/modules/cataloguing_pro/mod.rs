// Professional Cataloguing Module
// Handles MARC parsing

pub mod marc;
