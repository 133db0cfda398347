use std::fmt;
use std::path::PathBuf;

use reqwest::Url;

/// Where the exposition stream comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
    Url(Url),
}

impl Input {
    /// Classify a command-line argument.
    ///
    /// Absent or empty means stdin. Anything that parses as an absolute URL is fetched;
    /// everything else is treated as a file path.
    ///
    /// # Examples
    /// ```
    /// use promjson_fetch::Input;
    ///
    /// assert_eq!(Input::from_arg(None), Input::Stdin);
    /// assert!(matches!(Input::from_arg(Some("http://localhost:9090/metrics")), Input::Url(_)));
    /// assert!(matches!(Input::from_arg(Some("./metrics.txt")), Input::File(_)));
    /// ```
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            None | Some("") => Input::Stdin,
            Some(s) => match Url::parse(s) {
                Ok(url) => Input::Url(url),
                Err(_) => Input::File(PathBuf::from(s)),
            },
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => f.write_str("stdin"),
            Input::File(path) => write!(f, "{}", path.display()),
            Input::Url(url) => write!(f, "{url}"),
        }
    }
}
