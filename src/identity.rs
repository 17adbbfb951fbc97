//! Stable hardware identity used as the device id.

/// Format a MAC as `AA:BB:CC:DD:EE:FF`.
pub fn format_device_id(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Factory station MAC from eFuse.
#[cfg(feature = "esp32")]
pub fn read_mac() -> Result<[u8; 6], esp_idf_sys::EspError> {
    let mut mac = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes esp_read_mac writes.
    esp_idf_sys::esp!(unsafe {
        esp_idf_sys::esp_read_mac(
            mac.as_mut_ptr(),
            esp_idf_sys::esp_mac_type_t_ESP_MAC_WIFI_STA,
        )
    })?;
    Ok(mac)
}

/// Host stand-in for a MAC: derived from the hostname so it is stable across
/// runs on the same machine.
#[cfg(not(target_os = "espidf"))]
pub fn host_mac() -> [u8; 6] {
    use sha2::{Digest, Sha256};

    let hostname = std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string());
    mac_from_seed(&Sha256::digest(hostname.as_bytes()))
}

/// Locally administered unicast address from the first six seed bytes.
#[cfg(not(target_os = "espidf"))]
fn mac_from_seed(seed: &[u8]) -> [u8; 6] {
    let mut mac = [0u8; 6];
    for (dst, src) in mac.iter_mut().zip(seed) {
        *dst = *src;
    }
    mac[0] = (mac[0] | 0x02) & !0x01;
    mac
}
