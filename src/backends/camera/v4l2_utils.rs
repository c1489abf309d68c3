// SPDX-License-Identifier: GPL-3.0-only

//! Shared V4L2 utility functions
//!
//! Raw `VIDIOC_QUERYCAP` access for device discovery, kept separate from the
//! streaming code so enumeration never has to set up buffers.

use super::types::{BackendError, BackendResult, CameraDevice, DeviceInfo};
use crate::constants::CameraFacing;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use tracing::debug;

/// VIDIOC_QUERYCAP ioctl number
const VIDIOC_QUERYCAP: libc::c_ulong = 0x80685600;

/// Single-planar video capture
const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;

/// Set when `device_caps` is filled in
const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

/// V4L2 capability structure for VIDIOC_QUERYCAP ioctl
#[repr(C)]
struct V4l2Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

impl V4l2Capability {
    /// Capabilities of this node (not the whole physical device)
    fn node_caps(&self) -> u32 {
        if self.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
            self.device_caps
        } else {
            self.capabilities
        }
    }
}

fn c_str(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len]).trim().to_string()
}

/// Issue `VIDIOC_QUERYCAP` on an open descriptor
fn query_v4l2_cap(fd: RawFd) -> std::io::Result<V4l2Capability> {
    let mut cap: V4l2Capability = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, VIDIOC_QUERYCAP as _, &mut cap as *mut V4l2Capability) };
    if result < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(cap)
    }
}

/// Probe a device node and describe it if it can capture video
///
/// Errors keep their errno so the caller can tell a permission problem from a
/// missing or unsupported device.
pub fn probe_capture_device(device_path: &str) -> BackendResult<CameraDevice> {
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(device_path)
        .map_err(|e| BackendError::from_io(&e, device_path))?;

    let cap = query_v4l2_cap(file.as_raw_fd()).map_err(|e| BackendError::from_io(&e, device_path))?;

    if cap.node_caps() & V4L2_CAP_VIDEO_CAPTURE == 0 {
        return Err(BackendError::FormatNotSupported(format!(
            "{} is not a video capture node",
            device_path
        )));
    }

    let card = c_str(&cap.card);
    let real_path = std::fs::canonicalize(device_path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| device_path.to_string());

    debug!(device_path, card = %card, "Probed V4L2 capture device");

    Ok(CameraDevice {
        name: card.clone(),
        path: device_path.to_string(),
        facing: CameraFacing::from_device_name(&card),
        device_info: Some(DeviceInfo {
            card,
            driver: c_str(&cap.driver),
            path: device_path.to_string(),
            real_path,
        }),
    })
}

/// `/dev/videoN` nodes, in numeric order
pub fn video_device_nodes(dev_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dev_dir) else {
        return Vec::new();
    };

    let mut nodes: Vec<(u32, String)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let index = name.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, entry.path().to_string_lossy().to_string()))
        })
        .collect();

    nodes.sort_by_key(|(index, _)| *index);
    nodes.into_iter().map(|(_, path)| path).collect()
}

/// Pick the device to open: an exact path match, else the first with the
/// preferred facing, else the first device
pub fn choose_device<'a>(
    devices: &'a [CameraDevice],
    explicit: Option<&str>,
    facing: CameraFacing,
) -> Option<&'a CameraDevice> {
    if let Some(path) = explicit {
        return devices.iter().find(|d| d.path == path);
    }
    devices
        .iter()
        .find(|d| d.facing == facing)
        .or_else(|| devices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(path: &str, facing: CameraFacing) -> CameraDevice {
        CameraDevice {
            name: path.to_string(),
            path: path.to_string(),
            device_info: None,
            facing,
        }
    }

    #[test]
    fn test_choose_prefers_facing() {
        let devices = [
            device("/dev/video0", CameraFacing::Front),
            device("/dev/video2", CameraFacing::Back),
        ];
        let chosen = choose_device(&devices, None, CameraFacing::Back).unwrap();
        assert_eq!(chosen.path, "/dev/video2");
    }

    #[test]
    fn test_choose_falls_back_to_first() {
        let devices = [device("/dev/video0", CameraFacing::External)];
        let chosen = choose_device(&devices, None, CameraFacing::Back).unwrap();
        assert_eq!(chosen.path, "/dev/video0");
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let devices = [device("/dev/video0", CameraFacing::Back)];
        assert!(choose_device(&devices, Some("/dev/video9"), CameraFacing::Back).is_none());
    }

    #[test]
    fn test_video_nodes_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["video10", "video2", "video0", "media0"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let nodes = video_device_nodes(dir.path());
        let names: Vec<_> = nodes
            .iter()
            .map(|p| Path::new(p).file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["video0", "video2", "video10"]);
    }
}
