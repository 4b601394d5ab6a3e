pub mod actuator;
pub mod axis;
pub mod bridge;
pub mod command_server;
pub mod config;
pub mod dispatcher;
pub mod drawing;
pub mod dxf;
pub mod geometry;
pub mod homing;
pub mod logging;
pub mod motion;
pub mod path;
pub mod pid;
pub mod protocol;
pub mod units;
