//! Registry configuration.

/// Names and tags the registry reads and writes under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Collection holding marbles and the color index.
    pub marbles_collection: String,

    /// Collection holding marble private details.
    pub private_details_collection: String,

    /// Name of the color/name composite index.
    pub color_index: String,

    /// `docType` written on marbles.
    pub marble_doc_type: String,

    /// `docType` written on private details.
    pub private_details_doc_type: String,

    /// Whether owner queries lower-case their argument.
    pub lowercase_owner_queries: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marbles_collection: "collectionMarbles".to_string(),
            private_details_collection: "collectionMarblePrivateDetails".to_string(),
            color_index: "color~name".to_string(),
            marble_doc_type: "marble".to_string(),
            private_details_doc_type: "marblePrivateDetails".to_string(),
            lowercase_owner_queries: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the general collection name.
    #[must_use]
    pub fn marbles_collection(mut self, name: impl Into<String>) -> Self {
        self.marbles_collection = name.into();
        self
    }

    /// Sets the private details collection name.
    #[must_use]
    pub fn private_details_collection(mut self, name: impl Into<String>) -> Self {
        self.private_details_collection = name.into();
        self
    }

    /// Sets the color index name.
    #[must_use]
    pub fn color_index(mut self, name: impl Into<String>) -> Self {
        self.color_index = name.into();
        self
    }

    /// Sets whether owner queries lower-case their argument.
    #[must_use]
    pub const fn lowercase_owner_queries(mut self, value: bool) -> Self {
        self.lowercase_owner_queries = value;
        self
    }
}
