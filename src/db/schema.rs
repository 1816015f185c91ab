pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- accounts table
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_email ON accounts(email);

-- plants table
CREATE TABLE IF NOT EXISTS plants (
    id TEXT PRIMARY KEY NOT NULL,
    owner_id TEXT NOT NULL REFERENCES accounts(id),
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    care_frequency_days INTEGER NOT NULL CHECK (care_frequency_days BETWEEN 1 AND 36500),
    image_ref TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_plants_owner_id ON plants(owner_id);

-- care_events table
CREATE TABLE IF NOT EXISTS care_events (
    id TEXT PRIMARY KEY NOT NULL,
    plant_id TEXT NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
    care_type TEXT NOT NULL,
    care_date TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_care_events_plant_id ON care_events(plant_id);
"#;
