pub mod availability_routes;
pub mod client_routes;
pub mod reservation_routes;
pub mod vehicle_routes;
