//! Browser executable discovery.

use std::path::PathBuf;

/// Environment variable overriding executable discovery.
pub const CHROME_PATH_ENV: &str = "CHROME_PATH";

/// Finds a Chromium-family browser, honoring `CHROME_PATH` first.
pub fn find_chrome_executable() -> Option<PathBuf> {
	if let Some(path) = std::env::var_os(CHROME_PATH_ENV).map(PathBuf::from) {
		if path.exists() {
			return Some(path);
		}
	}

	candidates().into_iter().find_map(resolve_candidate)
}

fn resolve_candidate(candidate: String) -> Option<PathBuf> {
	if candidate.starts_with('/') || candidate.contains('\\') || candidate.contains(':') {
		let path = PathBuf::from(candidate);
		path.exists().then_some(path)
	} else {
		which::which(&candidate).ok()
	}
}

fn candidates() -> Vec<String> {
	if cfg!(target_os = "macos") {
		[
			"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
			"/Applications/Chromium.app/Contents/MacOS/Chromium",
			"/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
			"/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	} else if cfg!(target_os = "windows") {
		windows_candidates()
	} else {
		[
			"google-chrome-stable",
			"google-chrome",
			"chromium-browser",
			"chromium",
			"brave-browser",
			"/usr/bin/google-chrome-stable",
			"/usr/bin/google-chrome",
			"/usr/bin/chromium-browser",
			"/usr/bin/chromium",
			"/snap/bin/chromium",
		]
		.into_iter()
		.map(str::to_string)
		.collect()
	}
}

fn windows_candidates() -> Vec<String> {
	let mut roots: Vec<PathBuf> = ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
		.into_iter()
		.filter_map(|key| std::env::var_os(key).map(PathBuf::from))
		.collect();
	if roots.is_empty() {
		roots.push(PathBuf::from(r"C:\Program Files"));
		roots.push(PathBuf::from(r"C:\Program Files (x86)"));
	}

	let suffixes: &[&[&str]] = &[
		&["Google", "Chrome", "Application", "chrome.exe"],
		&["Microsoft", "Edge", "Application", "msedge.exe"],
		&["Chromium", "Application", "chrome.exe"],
	];

	let mut candidates: Vec<String> = roots
		.iter()
		.flat_map(|root| suffixes.iter().map(move |suffix| suffix.iter().fold(root.clone(), |path, part| path.join(part))))
		.map(|path: PathBuf| path.to_string_lossy().to_string())
		.collect();
	candidates.extend(["chrome.exe", "msedge.exe", "chromium.exe"].map(str::to_string));
	candidates
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn windows_candidates_include_common_commands() {
		let candidates = windows_candidates();
		assert!(candidates.contains(&"chrome.exe".to_string()));
		assert!(candidates.contains(&"msedge.exe".to_string()));
		assert!(candidates.iter().any(|c| c.ends_with("chrome.exe") && c.contains("Google")));
	}

	#[test]
	fn absolute_candidates_must_exist() {
		assert_eq!(resolve_candidate("/definitely/missing/chrome".into()), None);
	}
}
