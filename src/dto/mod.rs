//! Cuerpos de petición y respuesta de la API HTTP

pub mod api_response;
pub mod client_dto;
pub mod reservation_dto;
pub mod vehicle_dto;

pub use api_response::ApiResponse;
