#[derive(Debug, Clone, Default)]
pub enum OutputFormat {
    #[default]
    Default,
    Custom(String)
}

impl OutputFormat {
    pub fn as_arg(&self) -> Option<String> {
        match self {
            OutputFormat::Default => None,
            OutputFormat::Custom(s) => Some(s.clone())
        }
    }
}

/// Container the tool remuxes merged video+audio into.
#[derive(Debug, Clone, Default)]
pub enum Container {
    #[default]
    Default,
    Mp4,
    Custom(String)
}

impl Container {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Container::Default => None,
            Container::Mp4 => Some("mp4"),
            Container::Custom(s) => Some(s.as_str())
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub format: OutputFormat,
    pub container: Container,
    pub extra_args: Vec<String>
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }
}
