pub mod admin;
pub mod favorites;
pub mod health;
pub mod metadata;
pub mod params;
pub mod tags;
pub mod upload;
pub mod videos;
