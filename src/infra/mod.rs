// Infrastructure adapters implementing the application ports

pub mod json_output_adapter;
pub mod nominatim_geocoder;

pub use json_output_adapter::JsonFileOutput;
pub use nominatim_geocoder::NominatimGeocoder;
