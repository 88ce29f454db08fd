use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// The fixed target vocabulary every raw key is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    PermitId,
    PermitNumber,
    Status,
    StreetAddress,
    City,
    State,
    ZipCode,
    Latitude,
    Longitude,
    CouncilDistrict,
    CensusTract,
    ContractorName,
    ContractorLicense,
    ContractorPhone,
    ContractorAddress,
    ContractorType,
    ApplicantName,
    ApplicantCompany,
    ApplicantPhone,
    ApplicantEmail,
    ApplicantAddress,
    TotalValuation,
    PermitFee,
    PermitType,
    WorkClass,
    WorkDescription,
    UseCategory,
    IssueDate,
    ExpirationDate,
    ApplicationDate,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 30] = [
        CanonicalField::PermitId,
        CanonicalField::PermitNumber,
        CanonicalField::Status,
        CanonicalField::StreetAddress,
        CanonicalField::City,
        CanonicalField::State,
        CanonicalField::ZipCode,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
        CanonicalField::CouncilDistrict,
        CanonicalField::CensusTract,
        CanonicalField::ContractorName,
        CanonicalField::ContractorLicense,
        CanonicalField::ContractorPhone,
        CanonicalField::ContractorAddress,
        CanonicalField::ContractorType,
        CanonicalField::ApplicantName,
        CanonicalField::ApplicantCompany,
        CanonicalField::ApplicantPhone,
        CanonicalField::ApplicantEmail,
        CanonicalField::ApplicantAddress,
        CanonicalField::TotalValuation,
        CanonicalField::PermitFee,
        CanonicalField::PermitType,
        CanonicalField::WorkClass,
        CanonicalField::WorkDescription,
        CanonicalField::UseCategory,
        CanonicalField::IssueDate,
        CanonicalField::ExpirationDate,
        CanonicalField::ApplicationDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::PermitId => "permit_id",
            CanonicalField::PermitNumber => "permit_number",
            CanonicalField::Status => "status",
            CanonicalField::StreetAddress => "street_address",
            CanonicalField::City => "city",
            CanonicalField::State => "state",
            CanonicalField::ZipCode => "zip_code",
            CanonicalField::Latitude => "latitude",
            CanonicalField::Longitude => "longitude",
            CanonicalField::CouncilDistrict => "council_district",
            CanonicalField::CensusTract => "census_tract",
            CanonicalField::ContractorName => "contractor_name",
            CanonicalField::ContractorLicense => "contractor_license",
            CanonicalField::ContractorPhone => "contractor_phone",
            CanonicalField::ContractorAddress => "contractor_address",
            CanonicalField::ContractorType => "contractor_type",
            CanonicalField::ApplicantName => "applicant_name",
            CanonicalField::ApplicantCompany => "applicant_company",
            CanonicalField::ApplicantPhone => "applicant_phone",
            CanonicalField::ApplicantEmail => "applicant_email",
            CanonicalField::ApplicantAddress => "applicant_address",
            CanonicalField::TotalValuation => "total_valuation",
            CanonicalField::PermitFee => "permit_fee",
            CanonicalField::PermitType => "permit_type",
            CanonicalField::WorkClass => "work_class",
            CanonicalField::WorkDescription => "work_description",
            CanonicalField::UseCategory => "use_category",
            CanonicalField::IssueDate => "issue_date",
            CanonicalField::ExpirationDate => "expiration_date",
            CanonicalField::ApplicationDate => "application_date",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == key)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known raw spellings (already key-normalized) and their canonical field.
static ALIASES: &[(&str, CanonicalField)] = &[
    // Permit identification
    ("permit_num", CanonicalField::PermitNumber),
    ("permit_number", CanonicalField::PermitNumber),
    ("permitnumber", CanonicalField::PermitNumber),
    ("permit_no", CanonicalField::PermitNumber),
    ("permit_id", CanonicalField::PermitId),
    ("permitid", CanonicalField::PermitId),
    // Location
    ("original_address1", CanonicalField::StreetAddress),
    ("street_address", CanonicalField::StreetAddress),
    ("address", CanonicalField::StreetAddress),
    ("permit_location", CanonicalField::StreetAddress),
    ("original_city", CanonicalField::City),
    ("city", CanonicalField::City),
    ("original_state", CanonicalField::State),
    ("state", CanonicalField::State),
    ("original_zip", CanonicalField::ZipCode),
    ("zip_code", CanonicalField::ZipCode),
    ("zipcode", CanonicalField::ZipCode),
    ("zip", CanonicalField::ZipCode),
    ("postal_code", CanonicalField::ZipCode),
    ("council_district", CanonicalField::CouncilDistrict),
    ("council_district_code", CanonicalField::CouncilDistrict),
    ("council_dist", CanonicalField::CouncilDistrict),
    ("latitude", CanonicalField::Latitude),
    ("lat", CanonicalField::Latitude),
    ("longitude", CanonicalField::Longitude),
    ("lng", CanonicalField::Longitude),
    ("long", CanonicalField::Longitude),
    ("lon", CanonicalField::Longitude),
    ("census_tract", CanonicalField::CensusTract),
    ("censustract", CanonicalField::CensusTract),
    // Contractor
    ("contractor_name", CanonicalField::ContractorName),
    ("contractor_company_name", CanonicalField::ContractorName),
    ("contractor_trade_name", CanonicalField::ContractorName),
    ("contractor_phone", CanonicalField::ContractorPhone),
    ("contractor_phone_number", CanonicalField::ContractorPhone),
    ("contractor_address", CanonicalField::ContractorAddress),
    ("contractor_address1", CanonicalField::ContractorAddress),
    ("license_number", CanonicalField::ContractorLicense),
    ("contractor_license", CanonicalField::ContractorLicense),
    ("contractor_license_number", CanonicalField::ContractorLicense),
    ("contractor_type", CanonicalField::ContractorType),
    ("contractor_company_type", CanonicalField::ContractorType),
    // Applicant
    ("applicant_name", CanonicalField::ApplicantName),
    ("applicant_full_name", CanonicalField::ApplicantName),
    ("owner_name", CanonicalField::ApplicantName),
    ("applicant_company", CanonicalField::ApplicantCompany),
    ("applicant_org", CanonicalField::ApplicantCompany),
    ("applicant_phone", CanonicalField::ApplicantPhone),
    ("applicant_email", CanonicalField::ApplicantEmail),
    ("applicant_address", CanonicalField::ApplicantAddress),
    ("applicant_address1", CanonicalField::ApplicantAddress),
    // Valuation
    ("total_valuation", CanonicalField::TotalValuation),
    ("totalvaluation", CanonicalField::TotalValuation),
    ("total_job_valuation", CanonicalField::TotalValuation),
    ("valuation", CanonicalField::TotalValuation),
    ("permit_fee", CanonicalField::PermitFee),
    ("fee_amount", CanonicalField::PermitFee),
    // Work details
    ("permit_type_desc", CanonicalField::PermitType),
    ("permit_type", CanonicalField::PermitType),
    ("permittype", CanonicalField::PermitType),
    ("work_class", CanonicalField::WorkClass),
    ("permit_class", CanonicalField::WorkClass),
    ("permit_class_mapped", CanonicalField::WorkClass),
    ("description", CanonicalField::WorkDescription),
    ("work_description", CanonicalField::WorkDescription),
    ("scope_of_work", CanonicalField::WorkDescription),
    ("use_category", CanonicalField::UseCategory),
    ("use_type", CanonicalField::UseCategory),
    // Dates
    ("issue_date", CanonicalField::IssueDate),
    ("issued_date", CanonicalField::IssueDate),
    ("date_issued", CanonicalField::IssueDate),
    ("expiration_date", CanonicalField::ExpirationDate),
    ("expire_date", CanonicalField::ExpirationDate),
    ("expiresdate", CanonicalField::ExpirationDate),
    ("application_date", CanonicalField::ApplicationDate),
    ("applied_date", CanonicalField::ApplicationDate),
    ("applieddate", CanonicalField::ApplicationDate),
    // Status
    ("status", CanonicalField::Status),
    ("permit_status", CanonicalField::Status),
    ("current_status", CanonicalField::Status),
    ("status_current", CanonicalField::Status),
];

static ALIAS_TABLE: Lazy<HashMap<&'static str, CanonicalField>> =
    Lazy::new(|| ALIASES.iter().copied().collect());

/// Result of mapping one raw key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Canonical(CanonicalField),
    /// Unknown key, kept in its normalized spelling
    Passthrough(String),
}

impl FieldKey {
    pub fn as_str(&self) -> &str {
        match self {
            FieldKey::Canonical(field) => field.as_str(),
            FieldKey::Passthrough(key) => key,
        }
    }
}

/// Canonicalizes arbitrary key spellings against the alias table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldMapper;

impl FieldMapper {
    pub fn new() -> Self {
        Self
    }

    /// Lower-cases and trims the key, collapses every run of characters other
    /// than ASCII alphanumerics and `_` into one `_`, and strips edge underscores.
    pub fn normalize_key(raw_key: &str) -> String {
        let lowered = raw_key.trim().to_lowercase();
        let mut out = String::with_capacity(lowered.len());
        let mut last_was_sep = false;
        for c in lowered.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c);
                last_was_sep = false;
            } else if !last_was_sep {
                out.push('_');
                last_was_sep = true;
            }
        }
        out.trim_matches('_').to_string()
    }

    pub fn resolve_key(&self, raw_key: &str) -> FieldKey {
        let normalized = Self::normalize_key(raw_key);
        match ALIAS_TABLE.get(normalized.as_str()) {
            Some(field) => FieldKey::Canonical(*field),
            None => match CanonicalField::from_key(&normalized) {
                Some(field) => FieldKey::Canonical(field),
                None => FieldKey::Passthrough(normalized),
            },
        }
    }

    /// Canonical key for `raw_key`; unknown keys pass through normalized.
    pub fn map_key(&self, raw_key: &str) -> String {
        self.resolve_key(raw_key).as_str().to_string()
    }

    pub fn alias_count() -> usize {
        ALIAS_TABLE.len()
    }
}
