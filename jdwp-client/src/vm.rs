// VirtualMachine command implementations
//
// Whole-VM execution control: resume after a halt, dispose on detach

use crate::commands::{command_sets, vm_commands};
use crate::connection::JdwpConnection;
use crate::protocol::{CommandPacket, JdwpResult};

impl JdwpConnection {
    /// Resume all threads (VirtualMachine.Resume)
    pub async fn resume_all(&mut self) -> JdwpResult<()> {
        self.simple_vm_command(vm_commands::RESUME).await
    }

    /// Drop all requests, resume the VM and detach (VirtualMachine.Dispose)
    pub async fn dispose(&mut self) -> JdwpResult<()> {
        self.simple_vm_command(vm_commands::DISPOSE).await
    }

    async fn simple_vm_command(&mut self, command: u8) -> JdwpResult<()> {
        let packet = CommandPacket::new(self.next_id(), command_sets::VIRTUAL_MACHINE, command);

        let reply = self.send_command(packet).await?;
        reply.check_error()
    }
}
