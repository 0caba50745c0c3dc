//! Baseline catalog written by the seed pipeline

pub struct ActionSeed {
    pub slug: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
}

/// Which actions a role is meant to have before plan limits apply
pub enum RoleGrant {
    All,
    AllExcept(&'static [&'static str]),
    Only(&'static [&'static str]),
}

impl RoleGrant {
    pub fn includes(&self, slug: &str) -> bool {
        match self {
            RoleGrant::All => true,
            RoleGrant::AllExcept(excluded) => !excluded.contains(&slug),
            RoleGrant::Only(included) => included.contains(&slug),
        }
    }
}

pub struct RoleSeed {
    pub name: &'static str,
    pub priority: i32,
    pub description: &'static str,
    pub grant: RoleGrant,
}

pub struct PlanSeed {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub enabled: &'static [&'static str],
}

pub struct ModuleSeed {
    pub slug: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub actions: &'static [&'static str],
}

pub const ACTIONS: &[ActionSeed] = &[
    ActionSeed {
        slug: "PROJECT_VIEW",
        name: "View projects",
        category: "project",
        description: "List and open projects",
    },
    ActionSeed {
        slug: "PROJECT_CREATE",
        name: "Create projects",
        category: "project",
        description: "Create new projects",
    },
    ActionSeed {
        slug: "PROJECT_UPDATE",
        name: "Edit projects",
        category: "project",
        description: "Rename and edit existing projects",
    },
    ActionSeed {
        slug: "PROJECT_DELETE",
        name: "Delete projects",
        category: "project",
        description: "Permanently delete projects",
    },
    ActionSeed {
        slug: "MEMBER_VIEW",
        name: "View members",
        category: "member",
        description: "See who belongs to the workspace",
    },
    ActionSeed {
        slug: "MEMBER_INVITE",
        name: "Invite members",
        category: "member",
        description: "Send workspace invitations",
    },
    ActionSeed {
        slug: "MEMBER_REMOVE",
        name: "Remove members",
        category: "member",
        description: "Remove people from the workspace",
    },
    ActionSeed {
        slug: "MEMBER_ROLE_UPDATE",
        name: "Change member roles",
        category: "member",
        description: "Assign roles to workspace members",
    },
    ActionSeed {
        slug: "BILLING_VIEW",
        name: "View billing",
        category: "billing",
        description: "See the current plan and invoices",
    },
    ActionSeed {
        slug: "BILLING_MANAGE",
        name: "Manage billing",
        category: "billing",
        description: "Change plan and payment details",
    },
    ActionSeed {
        slug: "SETTINGS_VIEW",
        name: "View settings",
        category: "settings",
        description: "Read workspace settings",
    },
    ActionSeed {
        slug: "SETTINGS_UPDATE",
        name: "Update settings",
        category: "settings",
        description: "Change workspace settings",
    },
    ActionSeed {
        slug: "ANALYTICS_VIEW",
        name: "View analytics",
        category: "analytics",
        description: "Open usage dashboards",
    },
    ActionSeed {
        slug: "ANALYTICS_EXPORT",
        name: "Export analytics",
        category: "analytics",
        description: "Download usage reports",
    },
    ActionSeed {
        slug: "ADMIN_PERMISSIONS_MANAGE",
        name: "Manage permissions",
        category: "admin",
        description: "Edit plan entitlements and role allowances",
    },
    ActionSeed {
        slug: "ADMIN_AUDIT_VIEW",
        name: "View audit log",
        category: "admin",
        description: "Read the workspace audit trail",
    },
];

pub const ROLES: &[RoleSeed] = &[
    RoleSeed {
        name: "OWNER",
        priority: 0,
        description: "Workspace owner",
        grant: RoleGrant::All,
    },
    RoleSeed {
        name: "ADMIN",
        priority: 1,
        description: "Workspace administrator",
        grant: RoleGrant::AllExcept(&["BILLING_MANAGE", "PROJECT_DELETE"]),
    },
    RoleSeed {
        name: "MEMBER",
        priority: 2,
        description: "Regular workspace member",
        grant: RoleGrant::Only(&[
            "PROJECT_VIEW",
            "PROJECT_CREATE",
            "PROJECT_UPDATE",
            "MEMBER_VIEW",
            "SETTINGS_VIEW",
            "ANALYTICS_VIEW",
        ]),
    },
];

pub const PLANS: &[PlanSeed] = &[
    PlanSeed {
        name: "free",
        display_name: "Free",
        description: "Core project features for small teams",
        enabled: &[
            "PROJECT_VIEW",
            "PROJECT_CREATE",
            "PROJECT_UPDATE",
            "MEMBER_VIEW",
            "BILLING_VIEW",
            "BILLING_MANAGE",
            "SETTINGS_VIEW",
        ],
    },
    PlanSeed {
        name: "pro",
        display_name: "Pro",
        description: "Team management, analytics and permission editing",
        enabled: &[
            "PROJECT_VIEW",
            "PROJECT_CREATE",
            "PROJECT_UPDATE",
            "PROJECT_DELETE",
            "MEMBER_VIEW",
            "MEMBER_INVITE",
            "MEMBER_REMOVE",
            "MEMBER_ROLE_UPDATE",
            "BILLING_VIEW",
            "BILLING_MANAGE",
            "SETTINGS_VIEW",
            "SETTINGS_UPDATE",
            "ANALYTICS_VIEW",
            "ADMIN_PERMISSIONS_MANAGE",
        ],
    },
    PlanSeed {
        name: "business",
        display_name: "Business",
        description: "Everything, including exports and the audit log",
        enabled: &[
            "PROJECT_VIEW",
            "PROJECT_CREATE",
            "PROJECT_UPDATE",
            "PROJECT_DELETE",
            "MEMBER_VIEW",
            "MEMBER_INVITE",
            "MEMBER_REMOVE",
            "MEMBER_ROLE_UPDATE",
            "BILLING_VIEW",
            "BILLING_MANAGE",
            "SETTINGS_VIEW",
            "SETTINGS_UPDATE",
            "ANALYTICS_VIEW",
            "ANALYTICS_EXPORT",
            "ADMIN_PERMISSIONS_MANAGE",
            "ADMIN_AUDIT_VIEW",
        ],
    },
];

pub const MODULES: &[ModuleSeed] = &[
    ModuleSeed {
        slug: "projects",
        name: "Projects",
        icon: "folder",
        actions: &[
            "PROJECT_VIEW",
            "PROJECT_CREATE",
            "PROJECT_UPDATE",
            "PROJECT_DELETE",
        ],
    },
    ModuleSeed {
        slug: "team",
        name: "Team",
        icon: "users",
        actions: &[
            "MEMBER_VIEW",
            "MEMBER_INVITE",
            "MEMBER_REMOVE",
            "MEMBER_ROLE_UPDATE",
        ],
    },
    ModuleSeed {
        slug: "billing",
        name: "Billing",
        icon: "credit-card",
        actions: &["BILLING_VIEW", "BILLING_MANAGE"],
    },
    ModuleSeed {
        slug: "settings",
        name: "Settings",
        icon: "settings",
        actions: &["SETTINGS_VIEW", "SETTINGS_UPDATE", "ADMIN_PERMISSIONS_MANAGE"],
    },
    ModuleSeed {
        slug: "insights",
        name: "Insights",
        icon: "bar-chart",
        actions: &["ANALYTICS_VIEW", "ANALYTICS_EXPORT", "ADMIN_AUDIT_VIEW"],
    },
];
