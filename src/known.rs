//! Framework assemblies installed in the global assembly cache.
//!
//! References to these are recorded by name only; they are never looked up
//! on disk.

const KNOWN_ASSEMBLIES: &[&str] = &[
    "Accessibility.dll",
    "CustomMarshalers.dll",
    "IEExecRemote.dll",
    "IEHost.dll",
    "IIEHost.dll",
    "ISymWrapper.dll",
    "Microsoft.Build.dll",
    "Microsoft.Build.Conversion.dll",
    "Microsoft.Build.Conversion.v3.5.dll",
    "Microsoft.Build.Conversion.v4.0.dll",
    "Microsoft.Build.CPPTasks.Common.dll",
    "Microsoft.Build.CPPTasks.Itanium.dll",
    "Microsoft.Build.CPPTasks.Win32.dll",
    "Microsoft.Build.CPPTasks.x64.dll",
    "Microsoft.Build.Engine.dll",
    "Microsoft.Build.Framework.dll",
    "Microsoft.Build.Tasks.dll",
    "Microsoft.Build.Tasks.v3.5.dll",
    "Microsoft.Build.Tasks.v4.0.dll",
    "Microsoft.Build.Utilities.dll",
    "Microsoft.Build.Utilities.v3.5.dll",
    "Microsoft.Build.Utilities.v4.0.dll",
    "Microsoft.Build.VisualJSharp.dll",
    "Microsoft.JScript.dll",
    "Microsoft.VisualBasic.dll",
    "Microsoft.VisualC.dll",
    "Microsoft.VisualC.STLCLR.dll",
    "Mscorlib.dll",
    "PresentationBuildTasks.dll",
    "PresentationCFFRasterizer.dll",
    "PresentationCore.dll",
    "PresentationFramework.dll",
    "PresentationFramework.Aero.dll",
    "PresentationFramework.Classic.dll",
    "PresentationFramework.Luna.dll",
    "PresentationFramework.Royale.dll",
    "PresentationUI.dll",
    "ReachFramework.dll",
    "System.dll",
    "System.AddIn.dll",
    "System.AddIn.Contract.dll",
    "System.ComponentModel.Composition.dll",
    "System.ComponentModel.DataAnnotations.dll",
    "System.Configuration.dll",
    "System.Configuration.Install.dll",
    "System.Core.dll",
    "System.Data.dll",
    "System.Data.DataSetExtensions.dll",
    "System.Data.Entity.dll",
    "System.Data.Entity.Design.dll",
    "System.Data.Linq.dll",
    "System.Data.OracleClient.dll",
    "System.Data.Services.dll",
    "System.Data.Services.Client.dll",
    "System.Data.Services.Design.dll",
    "System.Data.SqlXml.dll",
    "System.Deployment.dll",
    "System.Design.dll",
    "System.DirectoryServices.dll",
    "System.DirectoryServices.AccountManagement.dll",
    "System.DirectoryServices.Protocols.dll",
    "System.Drawing.dll",
    "System.Drawing.Design.dll",
    "System.EnterpriseServices.dll",
    "System.IdentityModel.dll",
    "System.IdentityModel.Selectors.dll",
    "System.IO.Log.dll",
    "System.Management.Instrumentation.dll",
    "System.Net.dll",
    "System.Printing.dll",
    "System.Runtime.dll",
    "System.Runtime.Remoting.dll",
    "System.Runtime.Serialization.dll",
    "System.Runtime.Serialization.Formatters.Soap.dll",
    "System.Security.dll",
    "System.ServiceModel.dll",
    "System.ServiceModel.Channels.dll",
    "System.ServiceModel.Web.dll",
    "System.ServiceProcess.dll",
    "System.Speech.dll",
    "System.Transactions.dll",
    "System.Web.dll",
    "System.Web.Abstractions.dll",
    "System.Web.DynamicData.dll",
    "System.Web.DynamicData.Design.dll",
    "System.Web.Entity.dll",
    "System.Web.Entity.Design.dll",
    "System.Web.Extensions.dll",
    "System.Web.Extensions.Design.dll",
    "System.Web.Mobile.dll",
    "System.Web.RegularExpressions.dll",
    "System.Web.Routing.dll",
    "System.Web.Services.dll",
    "System.Windows.dll",
    "System.Windows.Browser.dll",
    "System.Windows.Forms.dll",
    "System.Windows.Presentation.dll",
    "System.Workflow.Activities.dll",
    "System.Workflow.ComponentModel.dll",
    "System.Workflow.Runtime.dll",
    "System.WorkflowServices.dll",
    "System.Xaml.dll",
    "System.Xaml.Hosting.dll",
    "System.Xml.dll",
    "System.Xml.Linq.dll",
    "UIAutomationClient.dll",
    "UIAutomationClientsideProviders.dll",
    "UIAutomationProvider.dll",
    "UIAutomationTypes.dll",
    "WindowsBase.dll",
    "WindowsFormsIntegration.dll",
];

/// Whether `name` is a known framework assembly. `.dll` is appended when
/// missing; the comparison ignores case.
pub fn is_known_assembly_name(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return false;
    }
    let has_extension = name
        .get(name.len().saturating_sub(4)..)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(".dll"));
    let file = if has_extension {
        name.to_string()
    } else {
        format!("{name}.dll")
    };
    KNOWN_ASSEMBLIES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(&file))
}
