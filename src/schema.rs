// Diesel schema for the jobs store. Kept in sync with repository/migrations.rs.

diesel::table! {
    jobs (id) {
        id -> Text,
        title -> Text,
        company -> Text,
        url -> Text,
        source -> Nullable<Text>,
        description -> Nullable<Text>,
        status -> Text,
        location -> Nullable<Text>,
        city -> Nullable<Text>,
        region -> Nullable<Text>,
        country -> Nullable<Text>,
        country_code -> Nullable<Text>,
        work_type -> Text,
        salary -> Nullable<Text>,
        salary_min -> Nullable<BigInt>,
        salary_max -> Nullable<BigInt>,
        salary_currency -> Nullable<Text>,
        job_type -> Nullable<Text>,
        experience_level -> Nullable<Text>,
        summary -> Nullable<Text>,
        mandatory_skills -> Text,
        preferred_skills -> Text,
        posted_date -> Nullable<Text>,
        requires_citizenship -> Bool,
        no_visa_sponsorship -> Bool,
        created_at -> Text,
        scraped_at -> Nullable<Text>,
        enriched_at -> Nullable<Text>,
    }
}
