use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Public URL prefix under which the artifact directory is served.
pub const PUBLIC_URL_PREFIX: &str = "/uploads";

pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const AUDIO_MIME_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/ogg", "audio/mp3"];
pub const VIDEO_MIME_TYPES: &[&str] = &["video/mp4", "video/mpeg", "video/quicktime", "video/webm"];
pub const PDF_MIME_TYPES: &[&str] = &["application/pdf"];

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Top-level application configuration, assembled once at startup and
/// injected into every service.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub database_url: String,
    pub server: ServerConfig,
    pub uploads: UploadLimits,
    pub storage: StorageConfig,
    pub background_removal: BackgroundRemovalConfig,
    pub cloudinary: Option<CloudinaryConfig>,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env_non_empty("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://toolsite.db?mode=rwc".to_string()),
            server: ServerConfig::from_env(),
            uploads: UploadLimits::from_env(),
            storage: StorageConfig::from_env(),
            background_removal: BackgroundRemovalConfig::from_env(),
            cloudinary: CloudinaryConfig::from_env(),
            mail: MailConfig::from_env(),
        }
    }

    /// Local-only configuration: filesystem artifact store, no external
    /// background removal, no cloud credentials, mail written to disk.
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            server: ServerConfig::default(),
            uploads: UploadLimits::default(),
            storage: StorageConfig::default(),
            background_removal: BackgroundRemovalConfig::default(),
            cloudinary: None,
            mail: MailConfig::development(),
        }
    }
}

/// HTTP server and local filesystem settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen host (default: "0.0.0.0")
    pub host: String,

    /// Listen port (default: 5000)
    pub port: u16,

    /// Directory served read-only under `/uploads`
    pub public_dir: PathBuf,

    /// Directory for per-request scratch files
    pub temp_dir: PathBuf,

    /// Allowed CORS origins
    pub allowed_origins: Vec<String>,

    /// Upper bound for any child process (ffmpeg, rembg)
    pub process_timeout: Duration,

    /// ffmpeg executable
    pub ffmpeg_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            public_dir: PathBuf::from("uploads"),
            temp_dir: PathBuf::from("temp"),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            process_timeout: Duration::from_secs(600),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        let mut allowed_origins = default.allowed_origins;
        if let Some(frontend) = env_non_empty("FRONTEND_URL") {
            allowed_origins.push(frontend);
        }

        Self {
            host: env_non_empty("HOST").unwrap_or(default.host),
            port: env_parse("PORT").unwrap_or(default.port),
            public_dir: env_non_empty("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.public_dir),
            temp_dir: env_non_empty("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.temp_dir),
            allowed_origins,
            process_timeout: env_parse("PROCESS_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(default.process_timeout),
            ffmpeg_path: env_non_empty("FFMPEG_PATH").unwrap_or(default.ffmpeg_path),
        }
    }
}

/// Limits enforced while reading multipart uploads
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum size of a single PDF (default: 50 MB)
    pub max_pdf_size: u64,

    /// Maximum number of PDFs per merge request (default: 20)
    pub max_pdf_files: usize,

    /// Maximum size of a single media file (default: 100 MB)
    pub max_media_size: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_pdf_size: 50 * 1024 * 1024,
            max_pdf_files: 20,
            max_media_size: 100 * 1024 * 1024,
        }
    }
}

impl UploadLimits {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_pdf_size: env_parse("MAX_PDF_SIZE").unwrap_or(default.max_pdf_size),
            max_pdf_files: env_parse("MAX_PDF_FILES").unwrap_or(default.max_pdf_files),
            max_media_size: env_parse("MAX_MEDIA_SIZE").unwrap_or(default.max_media_size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

/// Where finished artifacts are kept
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// "local" or "s3" (default: "local")
    pub backend: StorageBackend,
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_bucket: String,
    pub s3_region: String,
    /// When set, artifact URLs are `<base>/<key>` instead of presigned URLs
    pub s3_public_base_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            s3_endpoint: None,
            s3_access_key: None,
            s3_secret_key: None,
            s3_bucket: "toolsite".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_public_base_url: None,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        let backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "s3" | "minio" => StorageBackend::S3,
            _ => StorageBackend::Local,
        };

        Self {
            backend,
            s3_endpoint: env_non_empty("S3_ENDPOINT"),
            s3_access_key: env_non_empty("S3_ACCESS_KEY"),
            s3_secret_key: env_non_empty("S3_SECRET_KEY"),
            s3_bucket: env_non_empty("S3_BUCKET").unwrap_or(default.s3_bucket),
            s3_region: env_non_empty("S3_REGION").unwrap_or(default.s3_region),
            s3_public_base_url: env_non_empty("S3_PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string()),
        }
    }
}

/// Out-of-process background removal (rembg CLI)
#[derive(Debug, Clone)]
pub struct BackgroundRemovalConfig {
    /// Enable the external process strategy (default: false)
    pub enabled: bool,

    /// Executable to invoke (default: "rembg")
    pub program: String,

    /// Segmentation model passed to the tool (default: "u2net_human_seg")
    pub model: String,
}

impl Default for BackgroundRemovalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "rembg".to_string(),
            model: "u2net_human_seg".to_string(),
        }
    }
}

impl BackgroundRemovalConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            enabled: env_flag("ENABLE_SERVER_BG_REMOVAL").unwrap_or(default.enabled),
            program: env_non_empty("BG_REMOVER_PROGRAM").unwrap_or(default.program),
            model: env_non_empty("BG_REMOVER_MODEL").unwrap_or(default.model),
        }
    }
}

/// Cloudinary credentials for AI background removal
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Override for the upload API root (default: https://api.cloudinary.com/v1_1)
    pub api_base_url: String,
}

impl CloudinaryConfig {
    /// Present only when all three credentials are configured.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            cloud_name: env_non_empty("CLOUDINARY_CLOUD_NAME")?,
            api_key: env_non_empty("CLOUDINARY_API_KEY")?,
            api_secret: env_non_empty("CLOUDINARY_API_SECRET")?,
            api_base_url: env_non_empty("CLOUDINARY_API_BASE_URL")
                .unwrap_or_else(|| "https://api.cloudinary.com/v1_1".to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
    },
    File {
        path: PathBuf,
    },
}

/// Contact form delivery
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Site mailbox: sender and recipient of contact messages
    pub account: String,
    pub transport: MailTransportConfig,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            transport: MailTransportConfig::Smtp {
                host: "smtp.gmail.com".to_string(),
                port: 587,
                username: String::new(),
                password: String::new(),
            },
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        let account = env_non_empty("EMAIL").unwrap_or_default();
        let transport = match env::var("MAIL_TRANSPORT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "file" => MailTransportConfig::File {
                path: env_non_empty("MAIL_FILE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("mail-outbox")),
            },
            _ => MailTransportConfig::Smtp {
                host: env_non_empty("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                port: env_parse("SMTP_PORT").unwrap_or(587),
                username: account.clone(),
                password: env_non_empty("EMAIL_PASSWORD").unwrap_or_default(),
            },
        };

        Self { account, transport }
    }

    pub fn development() -> Self {
        Self {
            account: "contact@toolsite.local".to_string(),
            transport: MailTransportConfig::File {
                path: PathBuf::from("mail-outbox"),
            },
        }
    }
}
