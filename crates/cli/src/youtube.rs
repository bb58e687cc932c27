use std::process::Command;

/// Resolves a YouTube page URL to a direct stream URL via yt-dlp.
///
/// The decoder only speaks container formats, so the page URL has to be
/// exchanged for a playable media URL first.
pub fn resolve_stream_url(url: &str) -> Result<String, Box<dyn std::error::Error>> {
    let output = Command::new("yt-dlp")
        .args(["--get-url", "--format", "best[ext=mp4]/best", url])
        .output()
        .map_err(|e| format!("failed to run yt-dlp (is it installed?): {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("yt-dlp failed: {}", stderr.trim()).into());
    }

    let stdout = String::from_utf8(output.stdout)?;
    let resolved = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or("yt-dlp returned no stream URL")?;
    Ok(resolved.to_string())
}
