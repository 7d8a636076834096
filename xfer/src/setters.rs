//! Typed convenience surface over the generic option/info access: one
//! setter per configuration switch and one getter per post-transfer field.
//!
//! Every setter funnels through [`Session::set_option`], so the kind
//! validation and fault handling there apply uniformly. List-valued options
//! have their setters in the session module proper because they maintain the
//! accumulated lists.

use std::io::{Read, Write};

use xfer_engine::{Info, Opt, OptValue, shared_reader, shared_writer};

use crate::error::{Error, Result};
use crate::session::Session;

macro_rules! flag_setters {
    ($(($fn:ident, $opt:ident)),+ $(,)?) => {
        $(
            pub fn $fn(&mut self, enabled: bool) -> Result<&mut Self> {
                self.set_option(Opt::$opt, OptValue::Bool(enabled))
            }
        )+
    };
}

macro_rules! long_setters {
    ($(($fn:ident, $opt:ident)),+ $(,)?) => {
        $(
            pub fn $fn(&mut self, amount: i64) -> Result<&mut Self> {
                self.set_option(Opt::$opt, OptValue::Long(amount))
            }
        )+
    };
}

macro_rules! str_setters {
    ($(($fn:ident, $opt:ident)),+ $(,)?) => {
        $(
            pub fn $fn(&mut self, value: &str) -> Result<&mut Self> {
                self.set_option(Opt::$opt, OptValue::from(value))
            }
        )+
    };
}

macro_rules! writer_setters {
    ($(($fn:ident, $opt:ident)),+ $(,)?) => {
        $(
            pub fn $fn(&mut self, sink: impl Write + Send + 'static) -> Result<&mut Self> {
                self.set_option(Opt::$opt, OptValue::Writer(shared_writer(sink)))
            }
        )+
    };
}

macro_rules! long_getters {
    ($(($fn:ident, $info:ident)),+ $(,)?) => {
        $(
            pub fn $fn(&self) -> Result<i64> {
                self.get_info(Info::$info)?
                    .as_long()
                    .ok_or(Error::NotAvailable)
            }
        )+
    };
}

macro_rules! double_getters {
    ($(($fn:ident, $info:ident)),+ $(,)?) => {
        $(
            pub fn $fn(&self) -> Result<f64> {
                self.get_info(Info::$info)?
                    .as_double()
                    .ok_or(Error::NotAvailable)
            }
        )+
    };
}

macro_rules! str_getters {
    ($(($fn:ident, $info:ident)),+ $(,)?) => {
        $(
            pub fn $fn(&self) -> Result<String> {
                self.get_info(Info::$info)?
                    .as_str()
                    .map(str::to_string)
                    .ok_or(Error::NotAvailable)
            }
        )+
    };
}

impl Session {
    flag_setters![
        (set_auto_referer, Autoreferer),
        (set_binary_transfer, BinaryTransfer),
        (set_cert_info, CertInfo),
        (set_cookie_session, CookieSession),
        (set_crlf, Crlf),
        (set_dns_use_global_cache, DnsUseGlobalCache),
        (set_fail_on_error, FailOnError),
        (set_file_time, FileTime),
        (set_follow_location, FollowLocation),
        (set_forbid_reuse, ForbidReuse),
        (set_fresh_connect, FreshConnect),
        (set_ftp_append, FtpAppend),
        (set_ftp_ascii, FtpAscii),
        (set_ftp_list_only, FtpListOnly),
        (set_ftp_use_eprt, FtpUseEprt),
        (set_ftp_use_epsv, FtpUseEpsv),
        (set_header, Header),
        (set_http_get, HttpGet),
        (set_http_proxy_tunnel, HttpProxyTunnel),
        (set_mute, Mute),
        (set_nobody, Nobody),
        (set_no_progress, NoProgress),
        (set_no_signal, NoSignal),
        (set_post, Post),
        (set_put, Put),
        (set_return_transfer, ReturnTransfer),
        (set_ssl_engine_default, SslEngineDefault),
        (set_ssl_verify_peer, SslVerifyPeer),
        (set_transfer_text, TransferText),
        (set_unrestricted_auth, UnrestrictedAuth),
        (set_upload, Upload),
        (set_verbose, Verbose),
    ];

    long_setters![
        (set_buffer_size, BufferSize),
        (set_close_policy, ClosePolicy),
        (set_connect_timeout, ConnectTimeout),
        (set_connect_timeout_ms, ConnectTimeoutMs),
        (set_dns_cache_timeout, DnsCacheTimeout),
        (set_ftp_ssl_auth, FtpSslAuth),
        (set_http_auth, HttpAuth),
        (set_http_version, HttpVersion),
        (set_infile_size, InfileSize),
        (set_low_speed_limit, LowSpeedLimit),
        (set_low_speed_time, LowSpeedTime),
        (set_max_connects, MaxConnects),
        (set_max_redirs, MaxRedirs),
        (set_max_recv_speed, MaxRecvSpeed),
        (set_max_send_speed, MaxSendSpeed),
        (set_netrc, Netrc),
        (set_port, Port),
        (set_protocols, Protocols),
        (set_proxy_auth, ProxyAuth),
        (set_proxy_port, ProxyPort),
        (set_proxy_type, ProxyType),
        (set_redir_protocols, RedirProtocols),
        (set_resume_from, ResumeFrom),
        (set_ssl_verify_host, SslVerifyHost),
        (set_ssl_version, SslVersion),
        (set_time_condition, TimeCondition),
        (set_timeout, Timeout),
        (set_timeout_ms, TimeoutMs),
        (set_time_value, TimeValue),
    ];

    str_setters![
        (set_ca_info, CaInfo),
        (set_ca_path, CaPath),
        (set_cookie, Cookie),
        (set_cookie_file, CookieFile),
        (set_cookie_jar, CookieJar),
        (set_custom_request, CustomRequest),
        (set_egd_socket, EgdSocket),
        (set_encoding, Encoding),
        (set_ftp_port, FtpPort),
        (set_interface, Interface),
        (set_krb4_level, Krb4Level),
        (set_post_fields, PostFields),
        (set_proxy, Proxy),
        (set_proxy_user_pwd, ProxyUserPwd),
        (set_random_file, RandomFile),
        (set_range, Range),
        (set_referer, Referer),
        (set_ssl_cert, SslCert),
        (set_ssl_cert_passwd, SslCertPasswd),
        (set_ssl_cert_type, SslCertType),
        (set_ssl_cipher_list, SslCipherList),
        (set_ssl_engine, SslEngine),
        (set_ssl_key, SslKey),
        (set_ssl_key_passwd, SslKeyPasswd),
        (set_ssl_key_type, SslKeyType),
        (set_url, Url),
        (set_user_agent, UserAgent),
        (set_user_pwd, UserPwd),
    ];

    writer_setters![
        (set_file, File),
        (set_stderr, Stderr),
        (set_write_header, WriteHeader),
    ];

    /// Source the upload body is read from.
    pub fn set_infile(&mut self, source: impl Read + Send + 'static) -> Result<&mut Self> {
        self.set_option(Opt::Infile, OptValue::Reader(shared_reader(source)))
    }

    /// Body-data hook, called with each received chunk. Returning less than
    /// the offered length aborts the transfer with a write error.
    pub fn set_write_function(
        &mut self,
        f: impl FnMut(&[u8]) -> usize + Send + 'static,
    ) -> Result<&mut Self> {
        self.set_option(Opt::WriteFunction, OptValue::write_fn(f))
    }

    /// Header hook, called once per received header line.
    pub fn set_header_function(
        &mut self,
        f: impl FnMut(&[u8]) -> usize + Send + 'static,
    ) -> Result<&mut Self> {
        self.set_option(Opt::HeaderFunction, OptValue::header_fn(f))
    }

    /// Progress hook `(dl_total, dl_now, ul_total, ul_now)`. Returning
    /// `true` aborts the transfer.
    pub fn set_progress_function(
        &mut self,
        f: impl FnMut(f64, f64, f64, f64) -> bool + Send + 'static,
    ) -> Result<&mut Self> {
        self.set_option(Opt::ProgressFunction, OptValue::progress_fn(f))
    }

    /// Upload-data hook. Fills the buffer and returns the byte count; 0
    /// signals end of data.
    pub fn set_read_function(
        &mut self,
        f: impl FnMut(&mut [u8]) -> usize + Send + 'static,
    ) -> Result<&mut Self> {
        self.set_option(Opt::ReadFunction, OptValue::read_fn(f))
    }

    /// Password-prompt hook, consulted when credentials lack a password.
    pub fn set_passwd_function(
        &mut self,
        f: impl FnMut(&str) -> Option<String> + Send + 'static,
    ) -> Result<&mut Self> {
        self.set_option(Opt::PasswdFunction, OptValue::passwd_fn(f))
    }

    str_getters![
        (get_effective_url, EffectiveUrl),
        (get_content_type, ContentType),
        (get_header_out, HeaderOut),
        (get_primary_ip, PrimaryIp),
        (get_local_ip, LocalIp),
    ];

    long_getters![
        (get_http_code, HttpCode),
        (get_file_time, FileTime),
        (get_redirect_count, RedirectCount),
        (get_header_size, HeaderSize),
        (get_request_size, RequestSize),
        (get_ssl_verify_result, SslVerifyResult),
        (get_http_connect_code, HttpConnectCode),
        (get_primary_port, PrimaryPort),
        (get_local_port, LocalPort),
    ];

    double_getters![
        (get_total_time, TotalTime),
        (get_name_lookup_time, NameLookupTime),
        (get_connect_time, ConnectTime),
        (get_pre_transfer_time, PreTransferTime),
        (get_start_transfer_time, StartTransferTime),
        (get_redirect_time, RedirectTime),
        (get_size_upload, SizeUpload),
        (get_size_download, SizeDownload),
        (get_speed_download, SpeedDownload),
        (get_speed_upload, SpeedUpload),
        (get_content_length_download, ContentLengthDownload),
        (get_content_length_upload, ContentLengthUpload),
    ];
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use xfer_engine::{Opt, OptValue};

    use crate::session::Session;
    use crate::session::mock::MockEngine;

    fn open_mock(engine: &MockEngine) -> Session {
        Session::with_engine(engine, None).unwrap()
    }

    #[test]
    fn typed_setters_forward_canonical_values() {
        let engine = MockEngine::default();
        let mut session = open_mock(&engine);
        session
            .set_url("http://example.test/a")
            .unwrap()
            .set_follow_location(true)
            .unwrap()
            .set_max_redirs(3)
            .unwrap();

        assert!(matches!(
            engine.last_value(Opt::Url),
            Some(OptValue::Str(s)) if s == "http://example.test/a"
        ));
        assert!(matches!(
            engine.last_value(Opt::FollowLocation),
            Some(OptValue::Long(1))
        ));
        assert!(matches!(
            engine.last_value(Opt::MaxRedirs),
            Some(OptValue::Long(3))
        ));
    }

    #[test]
    fn stream_and_hook_setters_carry_opaque_values() {
        let engine = MockEngine::default();
        let mut session = open_mock(&engine);
        session
            .set_file(Vec::new())
            .unwrap()
            .set_write_function(|chunk| chunk.len())
            .unwrap()
            .set_infile(std::io::empty())
            .unwrap();

        assert!(matches!(
            engine.last_value(Opt::File),
            Some(OptValue::Writer(_))
        ));
        assert!(matches!(
            engine.last_value(Opt::WriteFunction),
            Some(OptValue::WriteFn(_))
        ));
        assert!(matches!(
            engine.last_value(Opt::Infile),
            Some(OptValue::Reader(_))
        ));
    }

    #[test]
    fn typed_getters_read_the_outcome() {
        let engine = MockEngine::default();
        let mut session = open_mock(&engine);
        session.set_url("http://example.test/y").unwrap();
        session.execute().unwrap();

        assert_eq!(session.get_http_code().unwrap(), 200);
        assert_eq!(session.get_effective_url().unwrap(), "http://example.test/y");
        assert!((session.get_size_download().unwrap() - 2.0).abs() < f64::EPSILON);
    }
}
