mod controller;
pub use controller::crud_routes;
