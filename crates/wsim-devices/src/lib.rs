//! # wsim-devices
//!
//! Reference device kinds for the wireless network simulator, plus the unit
//! tests and reports that exercise them.
//!
//! | Node type         | Device                                  |
//! |-------------------|-----------------------------------------|
//! | `demo-blink`      | [`demo_blink::DemoBlink`]               |
//! | `mesh-activation` | [`mesh_activation::MeshActivation`]     |

pub mod demo_blink;
pub mod mesh_activation;

use wsim_engine::DeviceRegistry;
use wsim_harness::TestRegistry;

/// Register every reference device kind under its node type.
pub fn register_devices(devices: &mut DeviceRegistry) {
    devices.register_default::<demo_blink::DemoBlink>(demo_blink::NODE_TYPE);
    devices.register_default::<mesh_activation::MeshActivation>(mesh_activation::NODE_TYPE);
}

/// Register the unit tests and reports that ship with the reference devices.
pub fn register_tests(tests: &mut TestRegistry) {
    mesh_activation::register(tests);
}

/// A device registry holding every reference device kind.
pub fn device_registry() -> DeviceRegistry {
    let mut devices = DeviceRegistry::new();
    register_devices(&mut devices);
    devices
}

/// A test registry holding every reference unit test and report.
pub fn test_registry() -> TestRegistry {
    let mut tests = TestRegistry::new();
    register_tests(&mut tests);
    tests
}
