//! Lookup of codecs by encoding name.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::charset::{dbcs, hz, iso2022, Charset};
use crate::codec::{Codec, Kind};
use crate::error::CodecError;
use crate::util::normalize_encoding_name;

/// An immutable table of codecs by name.
///
/// Names are matched after [`normalize_encoding_name`], so `Shift-JIS`,
/// `shift_jis` and `SHIFT JIS` all find the same codec.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    codecs: HashMap<String, Arc<Codec>>,
    aliases: HashMap<String, String>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// All the built-in CJK codecs with their usual aliases.
    pub fn cjk() -> Self {
        fn codec(name: &str, charset: impl Charset + 'static, kind: Kind) -> Codec {
            Codec::new(name, Arc::new(charset), kind)
        }

        Self::builder()
            .register(codec("gbk", dbcs::GBK_LAYOUT, Kind::Stateless))
            .aliases("gbk", &["cp936", "ms936", "936"])
            .register(codec("gb2312", dbcs::GB2312_LAYOUT, Kind::Stateless))
            .aliases("gb2312", &["euc_cn", "euccn", "eucgb2312_cn", "gb2312_1980"])
            .register(codec("hz", hz::HZ, Kind::Stateful))
            .aliases("hz", &["hzgb", "hz_gb", "hz_gb_2312"])
            .register(codec("big5", dbcs::BIG5_LAYOUT, Kind::Stateless))
            .aliases("big5", &["big5_tw", "csbig5"])
            .register(codec("big5hkscs", dbcs::BIG5HKSCS, Kind::StatelessWithInit))
            .aliases("big5hkscs", &["big5_hkscs", "hkscs"])
            .register(codec("shift_jis", dbcs::SHIFT_JIS_LAYOUT, Kind::Stateless))
            .aliases("shift_jis", &["shiftjis", "sjis", "s_jis", "csshiftjis"])
            .register(codec("euc_jp", dbcs::EUC_JP_LAYOUT, Kind::Stateless))
            .aliases("euc_jp", &["eucjp", "ujis", "u_jis"])
            .register(codec("iso2022_jp", iso2022::ISO2022_JP, Kind::Iso2022))
            .aliases("iso2022_jp", &["csiso2022jp", "iso2022jp", "iso_2022_jp"])
            .register(codec("euc_kr", dbcs::EUC_KR_LAYOUT, Kind::Stateless))
            .aliases("euc_kr", &["euckr", "korean", "ksc5601", "ks_c_5601", "ks_x_1001"])
            .register(codec("cp949", dbcs::CP949_LAYOUT, Kind::Stateless))
            .aliases("cp949", &["949", "ms949", "uhc"])
            .register(codec("iso2022_kr", iso2022::ISO2022_KR, Kind::Iso2022))
            .aliases("iso2022_kr", &["csiso2022kr", "iso2022kr", "iso_2022_kr"])
            .build()
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<Codec>, CodecError> {
        let key = normalize_encoding_name(name);
        let key = self.aliases.get(&key).unwrap_or(&key);
        self.codecs
            .get(key)
            .cloned()
            .ok_or_else(|| CodecError::UnknownEncoding(name.to_owned()))
    }

    /// Canonical names of the registered codecs, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    codecs: HashMap<String, Arc<Codec>>,
    aliases: HashMap<String, String>,
}

impl RegistryBuilder {
    /// Adds a codec under its own name, replacing any earlier codec of the
    /// same name.
    pub fn register(mut self, codec: Codec) -> Self {
        let name = normalize_encoding_name(codec.name());
        debug!(name, kind = ?codec.kind(), "registering codec");
        self.codecs.insert(name, Arc::new(codec));
        self
    }

    /// Makes `alias` another name for the codec named `target`.
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases
            .insert(normalize_encoding_name(alias), normalize_encoding_name(target));
        self
    }

    pub fn aliases(self, target: &str, aliases: &[&str]) -> Self {
        aliases
            .iter()
            .fold(self, |builder, alias| builder.alias(alias, target))
    }

    pub fn build(self) -> Registry {
        Registry {
            codecs: self.codecs,
            aliases: self.aliases,
        }
    }
}

#[test]
fn cjk_lookup() {
    let registry = Registry::cjk();
    assert_eq!(registry.names().len(), 11);
    assert_eq!(registry.lookup("GBK").unwrap().name(), "gbk");
    assert_eq!(registry.lookup("cp936").unwrap().name(), "gbk");
    assert_eq!(registry.lookup("Shift-JIS").unwrap().name(), "shift_jis");
    assert_eq!(registry.lookup("ISO-2022-JP").unwrap().name(), "iso2022_jp");
    assert_eq!(registry.lookup("HZ-GB-2312").unwrap().kind(), Kind::Stateful);
    assert_eq!(
        registry.lookup("big5-hkscs").unwrap().kind(),
        Kind::StatelessWithInit
    );
    assert!(matches!(
        registry.lookup("utf-7"),
        Err(CodecError::UnknownEncoding(name)) if name == "utf-7"
    ));
}
