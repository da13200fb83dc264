use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "loopsync", version, about = "Upload data from Engage to Loop")]
pub struct Cli {
    /// Base URL of the Loop server.
    #[arg(long)]
    pub server: String,

    /// Token to authenticate to Loop.
    #[arg(long)]
    pub token: String,

    /// Georgia Tech username to authenticate to Engage.
    #[arg(long)]
    pub georgia_tech_username: String,

    /// Georgia Tech password to authenticate to Engage.
    #[arg(long)]
    pub georgia_tech_password: String,

    /// WebDriver endpoint (a locally running chromedriver) used to drive the
    /// interactive Engage login.
    #[arg(
        long,
        env = "LOOPSYNC_WEBDRIVER_URL",
        default_value = "http://localhost:9515"
    )]
    pub webdriver_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_all_four_credentials() {
        let err = Cli::try_parse_from(["loopsync", "--server", "https://loop.example.com"]);
        assert!(err.is_err());

        let cli = Cli::try_parse_from([
            "loopsync",
            "--server",
            "https://loop.example.com",
            "--token",
            "t",
            "--georgia-tech-username",
            "gburdell3",
            "--georgia-tech-password",
            "hunter2",
        ])
        .unwrap();
        assert_eq!(cli.server, "https://loop.example.com");
        assert_eq!(cli.webdriver_url, "http://localhost:9515");
    }
}
