mod resource_linux_bridge;

pub use resource_linux_bridge::{bridge_id, parse_bridge_id, LinuxBridgeResource};
