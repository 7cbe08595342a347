use url::Url;

/// A playable reference handed back by the resource resolver.
///
/// Either a variant playlist the decode engine streams segment by segment,
/// or a direct progressive URL. The engine never looks inside a playlist;
/// classification only matters for logging and for the decode engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaReference {
    /// Remote segmented-media playlist descriptor.
    Playlist { url: Url },
    /// Direct progressive media URL.
    Direct { url: Url },
}

impl MediaReference {
    /// Classify a URL by its path extension (`.m3u8` means playlist).
    pub fn from_url(url: Url) -> Self {
        if url.path().ends_with(".m3u8") {
            Self::Playlist { url }
        } else {
            Self::Direct { url }
        }
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        match self {
            Self::Playlist { url } | Self::Direct { url } => url,
        }
    }

    #[must_use]
    pub fn is_playlist(&self) -> bool {
        matches!(self, Self::Playlist { .. })
    }
}
