//! Fragment templates compiled into the binary
//!
//! Logical names mirror the on-disk layout under the crate's `templates/`
//! directory, so a user-tier override uses the same relative path.

macro_rules! assets {
    ($($name:literal),* $(,)?) => {
        &[$(($name, include_str!(concat!("../../", $name)))),*]
    };
}

static ASSETS: &[(&str, &str)] = assets![
    "templates/_services/docker-compose.yml",
    "templates/_traefik/traefik.yml",
    "templates/environments/generic-php/generic-php.base.yml",
    "templates/environments/generic-php/generic-php.mutagen.yml",
    "templates/environments/includes/allure.base.yml",
    "templates/environments/includes/blackfire.base.yml",
    "templates/environments/includes/db.base.yml",
    "templates/environments/includes/elasticsearch.base.yml",
    "templates/environments/includes/networks.base.yml",
    "templates/environments/includes/nginx.base.yml",
    "templates/environments/includes/node.base.yml",
    "templates/environments/includes/node.darwin.yml",
    "templates/environments/includes/node.linux.yml",
    "templates/environments/includes/node.windows.yml",
    "templates/environments/includes/php-fpm.base.yml",
    "templates/environments/includes/php-fpm.darwin.yml",
    "templates/environments/includes/php-fpm.linux.yml",
    "templates/environments/includes/php-fpm.windows.yml",
    "templates/environments/includes/rabbitmq.base.yml",
    "templates/environments/includes/redis.base.yml",
    "templates/environments/includes/selenium.base.yml",
    "templates/environments/includes/varnish.base.yml",
    "templates/environments/laravel/laravel.base.yml",
    "templates/environments/laravel/laravel.mutagen.yml",
    "templates/environments/magento1/magento1.base.yml",
    "templates/environments/magento1/magento1.blackfire.base.yml",
    "templates/environments/magento1/magento1.mutagen.yml",
    "templates/environments/magento2/magento2.base.yml",
    "templates/environments/magento2/magento2.blackfire.base.yml",
    "templates/environments/magento2/magento2.darwin.yml",
    "templates/environments/magento2/magento2.magepack.base.yml",
    "templates/environments/magento2/magento2.mutagen.yml",
    "templates/environments/magento2/magento2.splitdb.checkout.base.yml",
    "templates/environments/magento2/magento2.splitdb.sales.base.yml",
    "templates/environments/magento2/magento2.tests.base.yml",
    "templates/environments/pwa-studio/pwa-studio.base.yml",
    "templates/environments/pwa-studio/pwa-studio.mutagen.yml",
    "templates/environments/shopware/shopware.base.yml",
    "templates/environments/shopware/shopware.mutagen.yml",
    "templates/environments/symfony/symfony.base.yml",
    "templates/environments/symfony/symfony.mutagen.yml",
    "templates/environments/wordpress/wordpress.base.yml",
    "templates/environments/wordpress/wordpress.mutagen.yml",
];

/// Embedded template text by logical name
pub fn asset(name: &str) -> Option<&'static str> {
    ASSETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| *text)
}

/// Every embedded logical name, in sorted order
pub fn names() -> impl Iterator<Item = &'static str> {
    ASSETS.iter().map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_assets_present() {
        assert!(asset("templates/environments/includes/networks.base.yml").is_some());
        assert!(asset("templates/_services/docker-compose.yml").is_some());
        assert!(asset("templates/_traefik/traefik.yml").is_some());
        assert!(asset("templates/environments/includes/networks.linux.yml").is_none());
    }

    #[test]
    fn test_every_type_has_fragment_and_mutagen_config() {
        for t in crate::project::EnvType::ALL {
            let base = format!("templates/environments/{0}/{0}.base.yml", t);
            let sync = format!("templates/environments/{0}/{0}.mutagen.yml", t);
            assert!(asset(&base).is_some(), "{}", base);
            assert!(asset(&sync).is_some(), "{}", sync);
        }
    }

    #[test]
    fn test_names_sorted() {
        let all: Vec<_> = names().collect();
        let mut sorted = all.clone();
        sorted.sort();
        assert_eq!(all, sorted);
    }
}
