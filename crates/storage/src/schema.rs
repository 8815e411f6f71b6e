/// Database schema, applied statement by statement on startup.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS services (
    key TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    url TEXT NOT NULL,
    username TEXT,
    password TEXT,
    api_key TEXT,
    query_type TEXT NOT NULL,
    layer_name TEXT NOT NULL,
    layer_namespace TEXT,
    layer_typename TEXT,
    layer_workspace TEXT,
    cache_duration INTEGER NOT NULL DEFAULT 604800,
    srid INTEGER NOT NULL DEFAULT 4326,
    tolerance REAL NOT NULL DEFAULT 10.0,
    service_version TEXT NOT NULL DEFAULT '',
    provenance TEXT,
    notes TEXT,
    licensing TEXT,
    test_x REAL,
    test_y REAL,
    test_value TEXT,
    status TEXT
);

CREATE TABLE IF NOT EXISTS service_groups (
    key TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    group_type TEXT NOT NULL DEFAULT 'text',
    graphable BOOLEAN NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS group_services (
    group_key TEXT NOT NULL REFERENCES service_groups(key) ON DELETE CASCADE,
    service_key TEXT NOT NULL REFERENCES services(key) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (group_key, service_key)
);

CREATE TABLE IF NOT EXISTS collections (
    key TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS collection_groups (
    collection_key TEXT NOT NULL REFERENCES collections(key) ON DELETE CASCADE,
    group_key TEXT NOT NULL REFERENCES service_groups(key) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    PRIMARY KEY (collection_key, group_key)
);

CREATE TABLE IF NOT EXISTS caches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_key TEXT NOT NULL REFERENCES services(key) ON DELETE CASCADE,
    name TEXT NOT NULL,
    value TEXT,
    source_uri TEXT,
    geometry TEXT NOT NULL,
    min_x REAL NOT NULL,
    min_y REAL NOT NULL,
    max_x REAL NOT NULL,
    max_y REAL NOT NULL,
    created_time TEXT NOT NULL,
    expired_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_caches_service ON caches(service_key, expired_time);

CREATE INDEX IF NOT EXISTS idx_caches_bounds ON caches(min_x, max_x, min_y, max_y);

CREATE TABLE IF NOT EXISTS query_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    registry TEXT NOT NULL,
    key TEXT NOT NULL,
    x REAL NOT NULL,
    y REAL NOT NULL,
    srid INTEGER NOT NULL,
    tolerance REAL NOT NULL,
    output_format TEXT NOT NULL,
    created_time TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_tiers (
    name TEXT PRIMARY KEY,
    request_limit TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS api_tokens (
    token TEXT PRIMARY KEY,
    username TEXT NOT NULL,
    tier TEXT NOT NULL REFERENCES user_tiers(name),
    created_time TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS token_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL REFERENCES api_tokens(token) ON DELETE CASCADE,
    requested_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_token_requests ON token_requests(token, requested_time)
"#;
