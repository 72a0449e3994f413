pub const DEFAULT_IDENTITY_API_URL: &str = "https://npiregistry.cms.hhs.gov/api/";
pub const DEFAULT_IDENTITY_API_VERSION: &str = "2.1";
pub const DEFAULT_ENROLLMENT_API_URL: &str =
    "https://data.cms.gov/data-api/v1/dataset/0824b6d0-14ad-47a0-94e2-f317a3658317/data";

pub const DEFAULT_MIRROR_DB: &str = "data/npi.db";
pub const DEFAULT_USER_AGENT: &str = "npi-lookup/0.1";

/// Identity registry caps name searches at this many results.
pub const NAME_SEARCH_LIMIT: usize = 50;

pub const IDENTIFIER_LEN: usize = 10;
pub const PHONE_LEN: usize = 10;
pub const MIN_NAME_LEN: usize = 4;
pub const MIN_REGION_LEN: usize = 2;

pub const UNKNOWN: &str = "UNKNOWN";
