#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLink {
    pub route: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

impl NavLink {
    /// Exact match only, `/posts/1` does not activate `/posts`.
    pub fn is_active(&self, current_path: &str) -> bool {
        self.route == current_path
    }
}

pub const SIDEBAR_LINKS: &[NavLink] = &[
    NavLink {
        route: "/",
        label: "Home",
        icon: "/assets/icons/home.svg",
    },
    NavLink {
        route: "/explore",
        label: "Explore",
        icon: "/assets/icons/wallpaper.svg",
    },
    NavLink {
        route: "/all-users",
        label: "People",
        icon: "/assets/icons/people.svg",
    },
    NavLink {
        route: "/create-post",
        label: "Create Post",
        icon: "/assets/icons/gallery-add.svg",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_is_exact_match() {
        let home = SIDEBAR_LINKS[0];
        assert!(home.is_active("/"));
        assert!(!home.is_active("/explore"));

        let explore = SIDEBAR_LINKS[1];
        assert!(!explore.is_active("/explore/tags"));
        assert!(!explore.is_active("/explorer"));
    }
}
