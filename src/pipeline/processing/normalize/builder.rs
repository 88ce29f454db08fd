use tracing::debug;

use super::conflict::ResolvedRecord;
use super::field_mapper::CanonicalField as F;
use super::formatters::Formatters;
use super::values::{to_f64, to_i64};
use crate::domain::{
    Applicant, Contractor, Location, PermitDates, RunStats, Valuation, WorkDetails,
};
use crate::pipeline::processing::geocode::GeocodingFallback;

/// The nested sections of a canonical permit, built from one resolved record.
#[derive(Debug, Clone, PartialEq)]
pub struct PermitSections {
    pub location: Location,
    pub contractor: Contractor,
    pub applicant: Applicant,
    pub valuation: Valuation,
    pub work_details: WorkDetails,
    pub dates: PermitDates,
}

/// Assembles canonical sections from a resolved flat record.
#[derive(Clone)]
pub struct RecordBuilder {
    formatters: Formatters,
    geocoder: Option<GeocodingFallback>,
    default_city: String,
    default_state: String,
}

impl RecordBuilder {
    pub fn new(
        formatters: Formatters,
        geocoder: Option<GeocodingFallback>,
        default_city: impl Into<String>,
        default_state: impl Into<String>,
    ) -> Self {
        Self {
            formatters,
            geocoder,
            default_city: default_city.into(),
            default_state: default_state.into(),
        }
    }

    pub fn formatters(&self) -> &Formatters {
        &self.formatters
    }

    pub async fn build(&self, record: &ResolvedRecord, stats: &RunStats) -> PermitSections {
        PermitSections {
            location: self.build_location(record, stats).await,
            contractor: self.build_contractor(record),
            applicant: self.build_applicant(record),
            valuation: self.build_valuation(record, stats),
            work_details: self.build_work_details(record),
            dates: self.build_dates(record, stats),
        }
    }

    async fn build_location(&self, record: &ResolvedRecord, stats: &RunStats) -> Location {
        let street_address = record.text(F::StreetAddress);
        let city = record.text(F::City).unwrap_or_else(|| self.default_city.clone());
        let state = record.text(F::State).unwrap_or_else(|| self.default_state.clone());

        let zip_code = self
            .resolve_zip_code(record, street_address.as_deref(), &city, &state, stats)
            .await;

        Location {
            zip_code,
            latitude: record.get(F::Latitude).and_then(to_f64),
            longitude: record.get(F::Longitude).and_then(to_f64),
            council_district: record.get(F::CouncilDistrict).and_then(to_i64),
            census_tract: record.text(F::CensusTract),
            street_address,
            city,
            state,
        }
    }

    /// Source zip when it contains a postal code, otherwise a geocoded one
    /// when an address is available and a geocoder is configured.
    async fn resolve_zip_code(
        &self,
        record: &ResolvedRecord,
        street_address: Option<&str>,
        city: &str,
        state: &str,
        stats: &RunStats,
    ) -> Option<String> {
        if let Some(zip) = self.formatters.extract_zip(record.get(F::ZipCode)) {
            return Some(zip);
        }

        let street_address = street_address.filter(|s| !s.trim().is_empty())?;
        match &self.geocoder {
            Some(geocoder) => {
                debug!("Attempting to fill missing zip code for address: {}", street_address);
                geocoder
                    .lookup_postal_code(street_address, city, state, stats)
                    .await
            }
            None => None,
        }
    }

    fn build_contractor(&self, record: &ResolvedRecord) -> Contractor {
        Contractor {
            name: record.text(F::ContractorName),
            license_number: record.text(F::ContractorLicense),
            phone: self.formatters.normalize_phone(record.get(F::ContractorPhone)),
            address: record.text(F::ContractorAddress),
            company_type: record.text(F::ContractorType),
        }
    }

    fn build_applicant(&self, record: &ResolvedRecord) -> Applicant {
        Applicant {
            name: record.text(F::ApplicantName),
            company: record.text(F::ApplicantCompany),
            phone: self.formatters.normalize_phone(record.get(F::ApplicantPhone)),
            email: record.text(F::ApplicantEmail),
            address: record.text(F::ApplicantAddress),
        }
    }

    fn build_valuation(&self, record: &ResolvedRecord, stats: &RunStats) -> Valuation {
        Valuation {
            total_valuation: self
                .formatters
                .normalize_currency(record.get(F::TotalValuation), stats),
            permit_fee: self.formatters.normalize_currency(record.get(F::PermitFee), stats),
            ..Valuation::default()
        }
    }

    fn build_work_details(&self, record: &ResolvedRecord) -> WorkDetails {
        WorkDetails {
            permit_type: record.text(F::PermitType),
            work_class: record.text(F::WorkClass),
            description: record.text(F::WorkDescription),
            use_category: record.text(F::UseCategory),
        }
    }

    fn build_dates(&self, record: &ResolvedRecord, stats: &RunStats) -> PermitDates {
        PermitDates {
            issue_date: self.formatters.normalize_date(record.get(F::IssueDate), stats),
            expiration_date: self
                .formatters
                .normalize_date(record.get(F::ExpirationDate), stats),
            application_date: self
                .formatters
                .normalize_date(record.get(F::ApplicationDate), stats),
        }
    }
}
