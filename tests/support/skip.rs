/// Skip a test if no usable gpg binary is on PATH.
#[macro_export]
macro_rules! skip_without_gpg {
    () => {
        if std::process::Command::new("gpg")
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| !s.success())
            .unwrap_or(true)
        {
            eprintln!("SKIPPED: gpg not installed");
            return;
        }
    };
}
