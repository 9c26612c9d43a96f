/// CPU architecture of the host or of a prebuilt artifact.
///
/// The descriptor only ever asks one question of the host: does its
/// architecture satisfy the declared [`PlatformRequirement`]? The 32-bit
/// variants exist so that question can be answered negatively.
///
/// # Example
///
/// ```
/// use kit_schema::Arch;
///
/// let current = Arch::current();
/// println!("Running on: {}", current);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// ARM64 (Apple Silicon, Graviton, ...)
    #[serde(alias = "aarch64")]
    Arm64,
    /// `x86_64` / amd64
    #[serde(rename = "x86_64", alias = "amd64")]
    X86_64,
    /// 32-bit x86 (i386/i686)
    X86,
    /// 32-bit ARM (armv6/armv7)
    Arm,
    /// Any other architecture with 64-bit pointers
    Other64,
    /// Any other architecture with 32-bit (or narrower) pointers
    Other32,
}

impl Arch {
    /// Get the current architecture
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            Self::Arm64
        }
        #[cfg(target_arch = "x86")]
        {
            Self::X86
        }
        #[cfg(target_arch = "arm")]
        {
            Self::Arm
        }
        #[cfg(target_arch = "x86_64")]
        {
            Self::X86_64
        }
        #[cfg(not(any(
            target_arch = "aarch64",
            target_arch = "x86_64",
            target_arch = "x86",
            target_arch = "arm"
        )))]
        {
            if cfg!(target_pointer_width = "64") {
                Self::Other64
            } else {
                Self::Other32
            }
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Arm => "arm",
            Self::Other64 => "other64",
            Self::Other32 => "other32",
        }
    }

    /// Whether this architecture has a 64-bit address space.
    pub fn is_64_bit(self) -> bool {
        matches!(self, Self::Arm64 | Self::X86_64 | Self::Other64)
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86_64" | "amd64" | "x64" => Ok(Self::X86_64),
            "x86" | "i386" | "i686" => Ok(Self::X86),
            "arm" | "armv6" | "armv7" => Ok(Self::Arm),
            "other64" => Ok(Self::Other64),
            "other32" => Ok(Self::Other32),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

/// Predicate over the host architecture that gates installation.
///
/// In TOML this is either a keyword or an explicit list:
///
/// ```toml
/// [platform]
/// require = "64-bit"          # or "any"
/// # require = ["x86_64", "arm64"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawRequirement", into = "RawRequirement")]
pub enum PlatformRequirement {
    /// No restriction.
    #[default]
    Any,
    /// Any 64-bit architecture.
    SixtyFourBit,
    /// Exactly one of the listed architectures.
    OneOf(Vec<Arch>),
}

impl PlatformRequirement {
    /// Evaluate the predicate for `arch`.
    pub fn is_satisfied_by(&self, arch: Arch) -> bool {
        match self {
            Self::Any => true,
            Self::SixtyFourBit => arch.is_64_bit(),
            Self::OneOf(allowed) => allowed.contains(&arch),
        }
    }
}

impl std::fmt::Display for PlatformRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::SixtyFourBit => write!(f, "64-bit"),
            Self::OneOf(archs) => {
                let names: Vec<&str> = archs.iter().copied().map(Arch::as_str).collect();
                write!(f, "{}", names.join(" | "))
            }
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum RawRequirement {
    Keyword(String),
    Archs(Vec<Arch>),
}

impl TryFrom<RawRequirement> for PlatformRequirement {
    type Error = String;

    fn try_from(raw: RawRequirement) -> Result<Self, Self::Error> {
        match raw {
            RawRequirement::Keyword(k) => match k.to_lowercase().as_str() {
                "any" => Ok(Self::Any),
                "64-bit" | "64bit" => Ok(Self::SixtyFourBit),
                other => Err(format!(
                    "Unknown platform requirement '{other}': expected \"any\", \"64-bit\" or a list of architectures"
                )),
            },
            RawRequirement::Archs(archs) if archs.is_empty() => {
                Err("Platform requirement lists no architectures".to_string())
            }
            RawRequirement::Archs(archs) => Ok(Self::OneOf(archs)),
        }
    }
}

impl From<PlatformRequirement> for RawRequirement {
    fn from(req: PlatformRequirement) -> Self {
        match req {
            PlatformRequirement::Any => Self::Keyword("any".to_string()),
            PlatformRequirement::SixtyFourBit => Self::Keyword("64-bit".to_string()),
            PlatformRequirement::OneOf(archs) => Self::Archs(archs),
        }
    }
}
