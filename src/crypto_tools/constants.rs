// Domain separation constants for hash function calls
pub const PUBLIC_SHARE_COMMIT_TAG: u8 = 0x00;
