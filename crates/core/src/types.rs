/// Draft and post identifiers assigned by the platform are 64-bit integers.
pub type DraftId = i64;
