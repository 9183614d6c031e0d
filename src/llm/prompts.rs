//! Prompt templates.

/// Prompt for turning a posting page into structured fields.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You are extracting structured data from a job posting page.

Page title: {title}
Company: {company}

Page content:
{content}

Identify the REAL job title (not the website name) and where the job is located.
Location must be split into parts. Use the FULL country name, e.g. "India", "United Kingdom", "United States".

Examples of correct locations:
- "Pune", "Maharashtra", "India"
- "London", "England", "United Kingdom"
- "Toronto", "Ontario", "Canada"

Extract these fields:
1. actual_job_title: the job title from the posting
2. location_city: city name only
3. location_state: state or province only (empty string if unknown)
4. location_country: full country name
5. description: job description (150-250 words)
6. summary: one sentence, at most 25 words
7. mandatory_skills: array of REQUIRED skills only
8. preferred_skills: array of NICE-TO-HAVE skills only
9. work_type: one of "remote", "hybrid", "onsite", "unknown"
10. salary: salary text as written, or "Not specified"
11. salary_min, salary_max: numbers without currency symbols, or null
12. salary_currency: ISO currency code, or ""
13. job_type: e.g. "Full-time", "Contract", or "Not specified"
14. experience_level: e.g. "Entry", "Mid", "Senior", or "Not specified"
15. posted_date: as written on the page, or "Not specified"
16. requires_citizenship: true ONLY if citizenship, green card or security clearance is explicitly required
17. no_visa_sponsorship: true ONLY if the posting explicitly says there is no visa sponsorship

Respond ONLY with one JSON object (no markdown, no explanation):
{
  "actual_job_title": "Senior Data Analyst",
  "location_city": "Pune",
  "location_state": "Maharashtra",
  "location_country": "India",
  "description": "...",
  "summary": "Senior analyst role focusing on reporting.",
  "mandatory_skills": ["SQL", "Python"],
  "preferred_skills": ["Tableau"],
  "work_type": "onsite",
  "salary": "Not specified",
  "salary_min": null,
  "salary_max": null,
  "salary_currency": "",
  "job_type": "Full-time",
  "experience_level": "Senior",
  "posted_date": "Posted 2 Days Ago",
  "requires_citizenship": false,
  "no_visa_sponsorship": false
}"#;

/// Prompt for splitting an already stored location string into parts.
pub const LOCATION_SPLIT_PROMPT: &str = r#"Extract city, state/province, and country from this job location string.

Location: "{location}"

Use the FULL country name, e.g. "India", "United Kingdom", "United States".
If any field is unknown, use an empty string.

Respond ONLY with one JSON object (no markdown, no explanation):
{"city": "Pune", "state": "Maharashtra", "country": "India"}"#;
