pub mod reward;
pub mod traffic_light_controller;
