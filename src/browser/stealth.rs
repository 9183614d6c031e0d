//! Evasion scripts registered to run before any page script.
//!
//! Career portals commonly sit behind bot managers that probe these
//! properties on first load.

pub const STEALTH_SCRIPTS: &[&str] = &[
    // navigator.webdriver is true under CDP control
    r#"
    Object.defineProperty(Navigator.prototype, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Headless Chrome ships without window.chrome
    r#"
    if (!window.chrome) {
        window.chrome = { runtime: {}, app: {}, csi: () => {}, loadTimes: () => {} };
    }
    "#,
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
    // Empty plugin list is a headless tell
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }
        ],
        configurable: true
    });
    "#,
    // Notification permission query disagrees with Notification.permission in headless mode
    r#"
    if (navigator.permissions && navigator.permissions.query) {
        const query = navigator.permissions.query.bind(navigator.permissions);
        navigator.permissions.query = (params) =>
            params && params.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : query(params);
    }
    "#,
];
