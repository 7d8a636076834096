use std::collections::BTreeMap;

/// Read-only post-transfer fields.
///
/// Identifiers follow the engine's published numbering (`0x100000` string,
/// `0x200000` long, `0x300000` double, plus the slot). `HeaderOut` is a
/// binding-level field and keeps the binding's identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Info {
    EffectiveUrl,
    HttpCode,
    FileTime,
    TotalTime,
    NameLookupTime,
    ConnectTime,
    PreTransferTime,
    StartTransferTime,
    RedirectTime,
    RedirectCount,
    SizeUpload,
    SizeDownload,
    SpeedDownload,
    SpeedUpload,
    HeaderSize,
    HeaderOut,
    RequestSize,
    SslVerifyResult,
    ContentLengthDownload,
    ContentLengthUpload,
    ContentType,
    HttpConnectCode,
    PrimaryIp,
    PrimaryPort,
    LocalIp,
    LocalPort,
}

/// Result shape of an [`Info`] field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum InfoKind {
    Str,
    Long,
    Double,
}

impl Info {
    /// The engine's numeric identifier for this field.
    #[must_use]
    pub fn native_id(self) -> i64 {
        match self {
            Self::EffectiveUrl => 0x10_0001,
            Self::HttpCode => 0x20_0002,
            Self::TotalTime => 0x30_0003,
            Self::NameLookupTime => 0x30_0004,
            Self::ConnectTime => 0x30_0005,
            Self::PreTransferTime => 0x30_0006,
            Self::SizeUpload => 0x30_0007,
            Self::SizeDownload => 0x30_0008,
            Self::SpeedDownload => 0x30_0009,
            Self::SpeedUpload => 0x30_000a,
            Self::HeaderSize => 0x20_000b,
            Self::RequestSize => 0x20_000c,
            Self::SslVerifyResult => 0x20_000d,
            Self::FileTime => 0x20_000e,
            Self::ContentLengthDownload => 0x30_000f,
            Self::ContentLengthUpload => 0x30_0010,
            Self::StartTransferTime => 0x30_0011,
            Self::ContentType => 0x10_0012,
            Self::RedirectTime => 0x30_0013,
            Self::RedirectCount => 0x20_0014,
            Self::HttpConnectCode => 0x20_0016,
            Self::PrimaryIp => 0x10_0020,
            Self::PrimaryPort => 0x20_0028,
            Self::LocalIp => 0x10_0029,
            Self::LocalPort => 0x20_002a,
            Self::HeaderOut => 2,
        }
    }

    #[must_use]
    pub fn kind(self) -> InfoKind {
        match self {
            Self::EffectiveUrl
            | Self::ContentType
            | Self::HeaderOut
            | Self::PrimaryIp
            | Self::LocalIp => InfoKind::Str,

            Self::HttpCode
            | Self::FileTime
            | Self::RedirectCount
            | Self::HeaderSize
            | Self::RequestSize
            | Self::SslVerifyResult
            | Self::HttpConnectCode
            | Self::PrimaryPort
            | Self::LocalPort => InfoKind::Long,

            Self::TotalTime
            | Self::NameLookupTime
            | Self::ConnectTime
            | Self::PreTransferTime
            | Self::StartTransferTime
            | Self::RedirectTime
            | Self::SizeUpload
            | Self::SizeDownload
            | Self::SpeedDownload
            | Self::SpeedUpload
            | Self::ContentLengthDownload
            | Self::ContentLengthUpload => InfoKind::Double,
        }
    }
}

/// A single post-transfer value, shaped per [`InfoKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Str(String),
    Long(i64),
    Double(f64),
}

impl InfoValue {
    #[must_use]
    pub fn kind(&self) -> InfoKind {
        match self {
            Self::Str(_) => InfoKind::Str,
            Self::Long(_) => InfoKind::Long,
            Self::Double(_) => InfoKind::Double,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }
}

/// The full post-transfer field set, as returned by a keyless info query.
pub type InfoMap = BTreeMap<Info, InfoValue>;
