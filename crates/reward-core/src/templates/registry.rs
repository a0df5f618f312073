//! Name to fragment-text lookup across the three template tiers

use super::assets;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Where a fragment template was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    UserCwd,
    UserHome,
    Embedded,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::UserCwd => "project",
            Tier::UserHome => "home",
            Tier::Embedded => "embedded",
        };
        f.write_str(s)
    }
}

/// A template resolved from one of the tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentTemplate {
    pub name: String,
    pub tier: Tier,
    pub text: String,
}

type AssetLookup = fn(&str) -> Option<&'static str>;

/// Tiered template lookup: project override directory, application home,
/// then the embedded asset table. First hit wins.
#[derive(Clone)]
pub struct TemplateRegistry {
    cwd_root: PathBuf,
    home_root: PathBuf,
    assets: AssetLookup,
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("cwd_root", &self.cwd_root)
            .field("home_root", &self.home_root)
            .finish()
    }
}

impl TemplateRegistry {
    /// `cwd_root` is the project's override directory (`<cwd>/.<app>`)
    pub fn new(cwd_root: &Path, home_root: &Path) -> Self {
        Self {
            cwd_root: cwd_root.to_path_buf(),
            home_root: home_root.to_path_buf(),
            assets: assets::asset,
        }
    }

    /// Replace the embedded tier
    pub fn with_assets(mut self, assets: AssetLookup) -> Self {
        self.assets = assets;
        self
    }

    /// Look `name` up in every tier; absence is not an error
    pub fn lookup(&self, name: &str) -> Result<Option<FragmentTemplate>> {
        if let Some(found) = self.lookup_user(name)? {
            return Ok(Some(found));
        }
        Ok((self.assets)(name).map(|text| FragmentTemplate {
            name: name.to_string(),
            tier: Tier::Embedded,
            text: text.to_string(),
        }))
    }

    /// Look `name` up in the project and home tiers only
    pub fn lookup_user(&self, name: &str) -> Result<Option<FragmentTemplate>> {
        for (tier, root) in [
            (Tier::UserCwd, &self.cwd_root),
            (Tier::UserHome, &self.home_root),
        ] {
            let path = root.join(name);
            if !path.is_file() {
                trace!(%tier, template = name, "template not found");
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            return Ok(Some(FragmentTemplate {
                name: name.to_string(),
                tier,
                text,
            }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_assets(name: &str) -> Option<&'static str> {
        match name {
            "templates/environments/includes/db.base.yml" => Some("embedded-db"),
            "templates/environments/includes/redis.base.yml" => Some("embedded-redis"),
            _ => None,
        }
    }

    fn write(root: &Path, name: &str, text: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_tier_precedence() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::new(cwd.path(), home.path()).with_assets(fake_assets);

        let db = "templates/environments/includes/db.base.yml";
        assert_eq!(registry.lookup(db).unwrap().unwrap().tier, Tier::Embedded);

        write(home.path(), db, "home-db");
        let found = registry.lookup(db).unwrap().unwrap();
        assert_eq!((found.tier, found.text.as_str()), (Tier::UserHome, "home-db"));

        write(cwd.path(), db, "cwd-db");
        let found = registry.lookup(db).unwrap().unwrap();
        assert_eq!((found.tier, found.text.as_str()), (Tier::UserCwd, "cwd-db"));
    }

    #[test]
    fn test_home_consulted_without_cwd_override() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        write(home.path(), "reward-env.yml", "services: {}");
        let registry = TemplateRegistry::new(cwd.path(), home.path()).with_assets(fake_assets);

        let found = registry.lookup_user("reward-env.yml").unwrap().unwrap();
        assert_eq!(found.tier, Tier::UserHome);
    }

    #[test]
    fn test_missing_everywhere_is_silent() {
        let cwd = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::new(cwd.path(), cwd.path()).with_assets(fake_assets);
        assert!(registry
            .lookup("templates/environments/includes/db.linux.yml")
            .unwrap()
            .is_none());
        assert!(registry.lookup_user("reward-env.darwin.yml").unwrap().is_none());
    }

    #[test]
    fn test_user_lookup_skips_embedded() {
        let cwd = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::new(cwd.path(), cwd.path()).with_assets(fake_assets);
        assert!(registry
            .lookup_user("templates/environments/includes/redis.base.yml")
            .unwrap()
            .is_none());
    }
}
