use clap::builder::NonEmptyStringValueParser;
use clap::Parser;

use crate::export::ExportRequest;

/// Copy an Azure virtual machine's OS disk into a storage account as a VHD
/// blob, using a temporary read-only SAS for authorization.
#[derive(Debug, Parser)]
#[clap(name = "vhd-export", version, about)]
pub struct Cli {
    /// Resource group containing the VM, its OS disk and the storage account.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub resource_group: String,

    /// Virtual machine whose OS disk is copied.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub vm_name: String,

    /// Destination storage account.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub storage_account: String,

    /// Destination blob container.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub container: String,

    /// Destination blob name; must end in `.vhd`.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub destination: String,

    /// How long the temporary read SAS stays valid, in seconds.
    #[clap(long, default_value_t = 28800, value_parser = clap::value_parser!(u32).range(1..))]
    pub sas_expiry_secs: u32,

    /// Skip the confirmation prompt.
    #[clap(long)]
    pub no_confirm: bool,

    /// Subscription holding the resource group.
    #[clap(long, env = "AZURE_SUBSCRIPTION_ID", value_parser = NonEmptyStringValueParser::new())]
    pub subscription_id: String,
}

impl Cli {
    pub fn request(&self) -> ExportRequest {
        ExportRequest {
            resource_group: self.resource_group.clone(),
            vm_name: self.vm_name.clone(),
            storage_account: self.storage_account.clone(),
            container: self.container.clone(),
            destination: self.destination.clone(),
            sas_expiry_secs: self.sas_expiry_secs,
            no_confirm: self.no_confirm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "vhd-export",
            "--resource-group",
            "rg1",
            "--vm-name",
            "vm1",
            "--storage-account",
            "acct1",
            "--container",
            "c1",
            "--destination",
            "disk.vhd",
            "--subscription-id",
            "00000000-0000-0000-0000-000000000000",
        ]
    }

    #[test]
    fn expiry_defaults_to_eight_hours() {
        let cli = Cli::try_parse_from(base_args()).unwrap();
        assert_eq!(cli.sas_expiry_secs, 28800);
        assert!(!cli.no_confirm);
    }

    #[test]
    fn explicit_expiry_is_kept_verbatim() {
        let mut args = base_args();
        args.extend(["--sas-expiry-secs", "12345", "--no-confirm"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.sas_expiry_secs, 12345);
        assert!(cli.no_confirm);
    }

    #[test]
    fn zero_expiry_is_rejected() {
        let mut args = base_args();
        args.extend(["--sas-expiry-secs", "0"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut args = base_args();
        args[2] = "";
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn empty_subscription_id_is_rejected() {
        let mut args = base_args();
        args[12] = "";
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn subscription_id_falls_back_to_the_environment() {
        std::env::set_var("AZURE_SUBSCRIPTION_ID", "11111111-1111-1111-1111-111111111111");
        // Without the flag the env var fills the field; an explicit flag
        // still wins over it.
        let mut args = base_args();
        args.truncate(11);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(
            cli.subscription_id,
            "11111111-1111-1111-1111-111111111111"
        );

        let cli = Cli::try_parse_from(base_args()).unwrap();
        assert_eq!(
            cli.subscription_id,
            "00000000-0000-0000-0000-000000000000"
        );
        std::env::remove_var("AZURE_SUBSCRIPTION_ID");
    }

    #[test]
    fn request_mirrors_the_flags() {
        let cli = Cli::try_parse_from(base_args()).unwrap();
        let request = cli.request();
        assert_eq!(request.resource_group, "rg1");
        assert_eq!(request.vm_name, "vm1");
        assert_eq!(request.storage_account, "acct1");
        assert_eq!(request.container, "c1");
        assert_eq!(request.destination, "disk.vhd");
        assert_eq!(request.sas_expiry_secs, 28800);
    }
}
