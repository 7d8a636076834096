use crate::value::ValueKind;

/// Recognized configuration switches, one per option the original wrapper
/// surface exposes.
///
/// [`Opt::native_id`] reproduces the engine's published numbering so
/// configurations written against the native constants stay drop-in
/// compatible: plain long options carry their bare slot, string/list/object
/// options `10000 + slot`, callback options `20000 + slot`, large-offset
/// options `30000 + slot`. `ReturnTransfer` and `BinaryTransfer` are
/// binding-level options and keep the binding's identifiers; options the
/// engine has since retired (`Mute`, `ClosePolicy`, `PasswdFunction`) keep
/// their historical slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Opt {
    Autoreferer,
    BinaryTransfer,
    BufferSize,
    CaInfo,
    CaPath,
    CertInfo,
    ClosePolicy,
    ConnectTimeout,
    ConnectTimeoutMs,
    Cookie,
    CookieFile,
    CookieJar,
    CookieSession,
    Crlf,
    CustomRequest,
    DnsCacheTimeout,
    DnsUseGlobalCache,
    EgdSocket,
    Encoding,
    FailOnError,
    File,
    FileTime,
    FollowLocation,
    ForbidReuse,
    FreshConnect,
    FtpAppend,
    FtpAscii,
    FtpListOnly,
    FtpPort,
    FtpSslAuth,
    FtpUseEprt,
    FtpUseEpsv,
    Header,
    HeaderFunction,
    Http200Aliases,
    HttpAuth,
    HttpGet,
    HttpHeader,
    HttpProxyTunnel,
    HttpVersion,
    Infile,
    InfileSize,
    Interface,
    Krb4Level,
    LowSpeedLimit,
    LowSpeedTime,
    MaxConnects,
    MaxRedirs,
    MaxRecvSpeed,
    MaxSendSpeed,
    Mute,
    Netrc,
    Nobody,
    NoProgress,
    NoSignal,
    PasswdFunction,
    Port,
    Post,
    PostFields,
    PostQuote,
    ProgressFunction,
    Protocols,
    Proxy,
    ProxyAuth,
    ProxyPort,
    ProxyType,
    ProxyUserPwd,
    Put,
    Quote,
    RandomFile,
    Range,
    ReadFunction,
    RedirProtocols,
    Referer,
    ResumeFrom,
    ReturnTransfer,
    SslCert,
    SslCertPasswd,
    SslCertType,
    SslCipherList,
    SslEngine,
    SslEngineDefault,
    SslKey,
    SslKeyPasswd,
    SslKeyType,
    SslVerifyHost,
    SslVerifyPeer,
    SslVersion,
    Stderr,
    TimeCondition,
    Timeout,
    TimeoutMs,
    TimeValue,
    TransferText,
    UnrestrictedAuth,
    Upload,
    Url,
    UserAgent,
    UserPwd,
    Verbose,
    WriteFunction,
    WriteHeader,
}

impl Opt {
    /// The engine's numeric identifier for this option.
    #[must_use]
    pub fn native_id(self) -> i64 {
        match self {
            Self::Autoreferer => 58,
            Self::BinaryTransfer => 19914,
            Self::BufferSize => 98,
            Self::CaInfo => 10065,
            Self::CaPath => 10097,
            Self::CertInfo => 172,
            Self::ClosePolicy => 72,
            Self::ConnectTimeout => 78,
            Self::ConnectTimeoutMs => 156,
            Self::Cookie => 10022,
            Self::CookieFile => 10031,
            Self::CookieJar => 10082,
            Self::CookieSession => 96,
            Self::Crlf => 27,
            Self::CustomRequest => 10036,
            Self::DnsCacheTimeout => 92,
            Self::DnsUseGlobalCache => 91,
            Self::EgdSocket => 10077,
            Self::Encoding => 10102,
            Self::FailOnError => 45,
            Self::File => 10001,
            Self::FileTime => 69,
            Self::FollowLocation => 52,
            Self::ForbidReuse => 75,
            Self::FreshConnect => 74,
            Self::FtpAppend => 50,
            // FtpAscii is the engine's historical alias for TransferText.
            Self::FtpAscii | Self::TransferText => 53,
            Self::FtpListOnly => 48,
            Self::FtpPort => 10017,
            Self::FtpSslAuth => 129,
            Self::FtpUseEprt => 106,
            Self::FtpUseEpsv => 85,
            Self::Header => 42,
            Self::HeaderFunction => 20079,
            Self::Http200Aliases => 10104,
            Self::HttpAuth => 107,
            Self::HttpGet => 80,
            Self::HttpHeader => 10023,
            Self::HttpProxyTunnel => 61,
            Self::HttpVersion => 84,
            Self::Infile => 10009,
            Self::InfileSize => 14,
            Self::Interface => 10062,
            Self::Krb4Level => 10063,
            Self::LowSpeedLimit => 19,
            Self::LowSpeedTime => 20,
            Self::MaxConnects => 71,
            Self::MaxRedirs => 68,
            Self::MaxRecvSpeed => 30146,
            Self::MaxSendSpeed => 30145,
            Self::Mute => 55,
            Self::Netrc => 51,
            Self::Nobody => 44,
            Self::NoProgress => 43,
            Self::NoSignal => 99,
            Self::PasswdFunction => 20066,
            Self::Port => 3,
            Self::Post => 47,
            Self::PostFields => 10015,
            Self::PostQuote => 10039,
            Self::ProgressFunction => 20056,
            Self::Protocols => 181,
            Self::Proxy => 10004,
            Self::ProxyAuth => 111,
            Self::ProxyPort => 59,
            Self::ProxyType => 101,
            Self::ProxyUserPwd => 10006,
            Self::Put => 54,
            Self::Quote => 10028,
            Self::RandomFile => 10076,
            Self::Range => 10007,
            Self::ReadFunction => 20012,
            Self::RedirProtocols => 182,
            Self::Referer => 10016,
            Self::ResumeFrom => 21,
            Self::ReturnTransfer => 19913,
            Self::SslCert => 10025,
            // SslCertPasswd and SslKeyPasswd share one native slot.
            Self::SslCertPasswd | Self::SslKeyPasswd => 10026,
            Self::SslCertType => 10086,
            Self::SslCipherList => 10083,
            Self::SslEngine => 10089,
            Self::SslEngineDefault => 90,
            Self::SslKey => 10087,
            Self::SslKeyType => 10088,
            Self::SslVerifyHost => 81,
            Self::SslVerifyPeer => 64,
            Self::SslVersion => 32,
            Self::Stderr => 10037,
            Self::TimeCondition => 33,
            Self::Timeout => 13,
            Self::TimeoutMs => 155,
            Self::TimeValue => 34,
            Self::UnrestrictedAuth => 105,
            Self::Upload => 46,
            Self::Url => 10002,
            Self::UserAgent => 10018,
            Self::UserPwd => 10005,
            Self::Verbose => 41,
            Self::WriteFunction => 20011,
            Self::WriteHeader => 10029,
        }
    }

    /// The value shape this option expects.
    #[must_use]
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Autoreferer
            | Self::BinaryTransfer
            | Self::CertInfo
            | Self::CookieSession
            | Self::Crlf
            | Self::DnsUseGlobalCache
            | Self::FailOnError
            | Self::FileTime
            | Self::FollowLocation
            | Self::ForbidReuse
            | Self::FreshConnect
            | Self::FtpAppend
            | Self::FtpAscii
            | Self::FtpListOnly
            | Self::FtpUseEprt
            | Self::FtpUseEpsv
            | Self::Header
            | Self::HttpGet
            | Self::HttpProxyTunnel
            | Self::Mute
            | Self::Nobody
            | Self::NoProgress
            | Self::NoSignal
            | Self::Post
            | Self::Put
            | Self::ReturnTransfer
            | Self::SslEngineDefault
            | Self::SslVerifyPeer
            | Self::TransferText
            | Self::UnrestrictedAuth
            | Self::Upload
            | Self::Verbose => ValueKind::Bool,

            Self::BufferSize
            | Self::ClosePolicy
            | Self::ConnectTimeout
            | Self::ConnectTimeoutMs
            | Self::DnsCacheTimeout
            | Self::FtpSslAuth
            | Self::HttpAuth
            | Self::HttpVersion
            | Self::InfileSize
            | Self::LowSpeedLimit
            | Self::LowSpeedTime
            | Self::MaxConnects
            | Self::MaxRedirs
            | Self::MaxRecvSpeed
            | Self::MaxSendSpeed
            | Self::Netrc
            | Self::Port
            | Self::Protocols
            | Self::ProxyAuth
            | Self::ProxyPort
            | Self::ProxyType
            | Self::RedirProtocols
            | Self::ResumeFrom
            | Self::SslVerifyHost
            | Self::SslVersion
            | Self::TimeCondition
            | Self::Timeout
            | Self::TimeoutMs
            | Self::TimeValue => ValueKind::Long,

            Self::CaInfo
            | Self::CaPath
            | Self::Cookie
            | Self::CookieFile
            | Self::CookieJar
            | Self::CustomRequest
            | Self::EgdSocket
            | Self::Encoding
            | Self::FtpPort
            | Self::Interface
            | Self::Krb4Level
            | Self::PostFields
            | Self::Proxy
            | Self::ProxyUserPwd
            | Self::RandomFile
            | Self::Range
            | Self::Referer
            | Self::SslCert
            | Self::SslCertPasswd
            | Self::SslCertType
            | Self::SslCipherList
            | Self::SslEngine
            | Self::SslKey
            | Self::SslKeyPasswd
            | Self::SslKeyType
            | Self::Url
            | Self::UserAgent
            | Self::UserPwd => ValueKind::Str,

            Self::Http200Aliases | Self::HttpHeader | Self::PostQuote | Self::Quote => {
                ValueKind::List
            }

            Self::File | Self::Stderr | Self::WriteHeader => ValueKind::Writer,
            Self::Infile => ValueKind::Reader,

            Self::WriteFunction => ValueKind::WriteFn,
            Self::HeaderFunction => ValueKind::HeaderFn,
            Self::ProgressFunction => ValueKind::ProgressFn,
            Self::ReadFunction => ValueKind::ReadFn,
            Self::PasswdFunction => ValueKind::PasswdFn,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;

    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn table_covers_the_original_surface() {
        assert_eq!(Opt::iter().count(), 102);
    }

    #[test]
    fn native_ids_are_unique_outside_documented_aliases() {
        let mut by_id: HashMap<i64, Vec<Opt>> = HashMap::new();
        for opt in Opt::iter() {
            by_id.entry(opt.native_id()).or_default().push(opt);
        }

        for (id, opts) in by_id {
            match id {
                53 => assert_eq!(opts.len(), 2, "TransferText/FtpAscii alias"),
                10026 => assert_eq!(opts.len(), 2, "cert/key passwd alias"),
                _ => assert_eq!(opts.len(), 1, "unexpected alias for id {id}: {opts:?}"),
            }
        }
    }

    #[test]
    fn native_ids_match_published_constants() {
        assert_eq!(Opt::Url.native_id(), 10002);
        assert_eq!(Opt::Timeout.native_id(), 13);
        assert_eq!(Opt::TimeoutMs.native_id(), 155);
        assert_eq!(Opt::HttpHeader.native_id(), 10023);
        assert_eq!(Opt::WriteFunction.native_id(), 20011);
        assert_eq!(Opt::HeaderFunction.native_id(), 20079);
        assert_eq!(Opt::PasswdFunction.native_id(), 20066);
        assert_eq!(Opt::MaxSendSpeed.native_id(), 30145);
        assert_eq!(Opt::MaxRecvSpeed.native_id(), 30146);
        assert_eq!(Opt::ReturnTransfer.native_id(), 19913);
        assert_eq!(Opt::BinaryTransfer.native_id(), 19914);
        assert_eq!(Opt::SslVerifyPeer.native_id(), 64);
        assert_eq!(Opt::SslVerifyHost.native_id(), 81);
    }

    #[test]
    fn value_kinds_spot_checks() {
        assert_eq!(Opt::Verbose.value_kind(), ValueKind::Bool);
        assert_eq!(Opt::SslVerifyHost.value_kind(), ValueKind::Long);
        assert_eq!(Opt::Url.value_kind(), ValueKind::Str);
        assert_eq!(Opt::HttpHeader.value_kind(), ValueKind::List);
        assert_eq!(Opt::File.value_kind(), ValueKind::Writer);
        assert_eq!(Opt::Infile.value_kind(), ValueKind::Reader);
        assert_eq!(Opt::ProgressFunction.value_kind(), ValueKind::ProgressFn);
    }

    #[test]
    fn string_round_trip() {
        assert_eq!(Opt::FollowLocation.to_string(), "follow_location");
        assert_eq!("http200_aliases".parse::<Opt>().unwrap(), Opt::Http200Aliases);
    }
}
