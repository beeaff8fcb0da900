use const_format::formatcp;

/// Mount path of the root filesystem.
pub const ROOT_MOUNT_POINT_PATH: &str = "/";

/// Mount path used by swap volumes.
pub const SWAP_MOUNT_POINT: &str = "swap";

/// Search shorthand matching every candidate device.
pub const SEARCH_MATCH_ALL: &str = "*";

/// Size bound meaning "the current size of the device".
pub const SIZE_CURRENT: &str = "current";

/// Size bound meaning "no upper limit".
pub const SIZE_UNLIMITED: &str = "unlimited";

pub const DEV_DIR: &str = "/dev";
pub const DEV_DISK_BY_ID: &str = formatcp!("{DEV_DIR}/disk/by-id");
pub const DEV_DISK_BY_PATH: &str = formatcp!("{DEV_DIR}/disk/by-path");

/// Prefix for aliases assigned by the boot device solver.
pub const BOOT_ALIAS_PREFIX: &str = "boot-device";
