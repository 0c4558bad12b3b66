//! ABI targeting.

use directory_schema::DeviceAttributes;
use directory_schema::targeting::{Abi, Targeting};

use super::resolve;

/// Matches when the entry's ABI is the candidate the device prefers most.
///
/// Device ABIs are ordered by preference; unknown ABI names are ignored.
pub fn matches(device: &DeviceAttributes, targeting: &Targeting<Abi>) -> bool {
    if device.supported_abis.is_empty() {
        return false;
    }
    let winner = device
        .supported_abis
        .iter()
        .filter_map(|name| name.parse::<Abi>().ok())
        .find(|abi| targeting.candidates().any(|c| c == abi));
    resolve(targeting, winner, |v| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(abis: &[&str]) -> DeviceAttributes {
        DeviceAttributes {
            supported_abis: abis.iter().map(ToString::to_string).collect(),
            ..DeviceAttributes::default()
        }
    }

    #[test]
    fn test_most_preferred_abi_wins() {
        let device = device(&["arm64-v8a", "armeabi-v7a", "armeabi"]);
        let arm64 = Targeting::new(vec![Abi::Arm64V8a], vec![Abi::ArmeabiV7a, Abi::X86_64]);
        let armv7 = Targeting::new(vec![Abi::ArmeabiV7a], vec![Abi::Arm64V8a, Abi::X86_64]);
        let x86_64 = Targeting::new(vec![Abi::X86_64], vec![Abi::Arm64V8a, Abi::ArmeabiV7a]);
        assert!(matches(&device, &arm64));
        assert!(!matches(&device, &armv7));
        assert!(!matches(&device, &x86_64));
    }

    #[test]
    fn test_secondary_abi_used_when_primary_missing() {
        let device = device(&["arm64-v8a", "armeabi-v7a"]);
        let armv7 = Targeting::new(vec![Abi::ArmeabiV7a], vec![Abi::X86]);
        assert!(matches(&device, &armv7));
    }

    #[test]
    fn test_unsupported_abi_rejected() {
        let device = device(&["x86_64"]);
        assert!(!matches(&device, &Targeting::new(vec![Abi::Arm64V8a], vec![])));
        assert!(!matches(&DeviceAttributes::default(), &Targeting::new(vec![Abi::X86_64], vec![])));
    }
}
