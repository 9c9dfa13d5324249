// components module - Contains the entity platforms a device can expose

pub mod button;
pub mod entity;
pub mod sensor;

// Re-export commonly used items for convenience
pub use button::Button;
pub use entity::Entity;
pub use sensor::Sensor;
